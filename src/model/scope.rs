//! Identifier binding lookup.
//!
//! Walks outwards from a use site through enclosing blocks, statement
//! initializers, range clauses and function parameters, then falls back to
//! package-level declarations in any file of the same package.

use super::{syntax, Corpus, Located};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy)]
pub enum Binding<'a> {
    /// Initialized declaration or assignment. `result_index` is set when one
    /// call expression feeds several names.
    Value {
        expr: Located<'a>,
        result_index: Option<usize>,
        declared_type: Option<Located<'a>>,
    },
    /// `for k, v := range collection`; `position` is 0 for the key, 1 for the value.
    Range {
        collection: Located<'a>,
        position: usize,
    },
    Parameter { declared_type: Located<'a> },
    /// `var x T` without an initializer.
    Declared { declared_type: Located<'a> },
}

pub fn lookup<'a>(corpus: &'a Corpus, ident: Located<'a>) -> Option<Binding<'a>> {
    let name = ident.text();
    let use_pos = ident.node.start_byte();
    let mut current = ident.node;

    while let Some(parent) = current.parent() {
        let found = match parent.kind() {
            "block" | "statement_list" => search_statements(ident, parent, name, use_pos),
            "if_statement"
            | "expression_switch_statement"
            | "type_switch_statement"
            | "for_statement" => search_header(ident, parent, current, name, use_pos),
            "func_literal" | "function_declaration" | "method_declaration" => {
                search_signature(ident, parent, name)
            }
            "source_file" => break,
            _ => None,
        };
        if found.is_some() {
            return found;
        }
        current = parent;
    }

    let import_path = corpus.import_path_of(ident.file);
    let spec = corpus.find_value_spec(import_path, name)?;
    spec_binding(spec, name)
}

/// Binding of a package-level name in the package `import_path`.
pub fn package_binding<'a>(
    corpus: &'a Corpus,
    import_path: &str,
    name: &str,
) -> Option<Binding<'a>> {
    let spec = corpus.find_value_spec(import_path, name)?;
    spec_binding(spec, name)
}

fn search_statements<'a>(
    at: Located<'a>,
    block: Node<'a>,
    name: &str,
    use_pos: usize,
) -> Option<Binding<'a>> {
    let mut result = None;
    for stmt in syntax::named_children(block) {
        if stmt.end_byte() > use_pos {
            break;
        }
        let found = match stmt.kind() {
            "short_var_declaration" | "assignment_statement" => {
                assignment_binding(at, stmt, name)
            }
            "var_declaration" | "const_declaration" => super::value_specs(stmt)
                .into_iter()
                .find_map(|spec| spec_binding(at.with(spec), name)),
            _ => None,
        };
        if found.is_some() {
            result = found;
        }
    }
    result
}

fn search_header<'a>(
    at: Located<'a>,
    stmt: Node<'a>,
    from: Node<'a>,
    name: &str,
    use_pos: usize,
) -> Option<Binding<'a>> {
    for child in syntax::named_children(stmt) {
        if child.id() == from.id() || child.end_byte() > use_pos {
            continue;
        }
        match child.kind() {
            "short_var_declaration" => {
                if let Some(found) = assignment_binding(at, child, name) {
                    return Some(found);
                }
            }
            "for_clause" => {
                if let Some(init) = child.child_by_field_name("initializer") {
                    if let Some(found) = assignment_binding(at, init, name) {
                        return Some(found);
                    }
                }
            }
            "range_clause" => {
                let (Some(left), Some(right)) = (
                    child.child_by_field_name("left"),
                    child.child_by_field_name("right"),
                ) else {
                    continue;
                };
                let position = syntax::expression_items(left)
                    .iter()
                    .position(|n| syntax::text(*n, &at.file.source) == name);
                if let Some(position) = position {
                    return Some(Binding::Range {
                        collection: at.with(right),
                        position,
                    });
                }
            }
            _ => {}
        }
    }
    None
}

fn search_signature<'a>(at: Located<'a>, func: Node<'a>, name: &str) -> Option<Binding<'a>> {
    for field in ["receiver", "parameters"] {
        let Some(list) = func.child_by_field_name(field) else {
            continue;
        };
        for param in syntax::named_children(list) {
            let names = syntax::field_children(param, "name");
            if names
                .iter()
                .any(|n| syntax::text(*n, &at.file.source) == name)
            {
                let declared_type = param.child_by_field_name("type")?;
                return Some(Binding::Parameter {
                    declared_type: at.with(declared_type),
                });
            }
        }
    }

    let result = func.child_by_field_name("result")?;
    if result.kind() == "parameter_list" {
        for param in syntax::named_children(result) {
            let names = syntax::field_children(param, "name");
            if names
                .iter()
                .any(|n| syntax::text(*n, &at.file.source) == name)
            {
                let declared_type = param.child_by_field_name("type")?;
                return Some(Binding::Declared {
                    declared_type: at.with(declared_type),
                });
            }
        }
    }
    None
}

fn assignment_binding<'a>(at: Located<'a>, stmt: Node<'a>, name: &str) -> Option<Binding<'a>> {
    let left = stmt.child_by_field_name("left")?;
    let right = stmt.child_by_field_name("right")?;
    if stmt.kind() == "assignment_statement" {
        let op = stmt.child_by_field_name("operator")?;
        if syntax::text(op, &at.file.source) != "=" {
            return None;
        }
    }

    let names = syntax::expression_items(left);
    let index = names
        .iter()
        .position(|n| n.kind() == "identifier" && syntax::text(*n, &at.file.source) == name)?;
    value_binding(at, &names, syntax::expression_items(right), index, None)
}

/// Binding for `name` declared by a `var_spec` or `const_spec`.
pub fn spec_binding<'a>(spec: Located<'a>, name: &str) -> Option<Binding<'a>> {
    let names = syntax::field_children(spec.node, "name");
    let index = names
        .iter()
        .position(|n| syntax::text(*n, &spec.file.source) == name)?;
    let declared_type = spec.child("type");

    match spec.node.child_by_field_name("value") {
        Some(value) => value_binding(
            spec,
            &names,
            syntax::expression_items(value),
            index,
            declared_type,
        ),
        None => declared_type.map(|declared_type| Binding::Declared { declared_type }),
    }
}

fn value_binding<'a>(
    at: Located<'a>,
    names: &[Node<'a>],
    values: Vec<Node<'a>>,
    index: usize,
    declared_type: Option<Located<'a>>,
) -> Option<Binding<'a>> {
    if values.len() == names.len() {
        return Some(Binding::Value {
            expr: at.with(values[index]),
            result_index: None,
            declared_type,
        });
    }
    if values.len() == 1 {
        return Some(Binding::Value {
            expr: at.with(values[0]),
            result_index: Some(index),
            declared_type,
        });
    }
    None
}
