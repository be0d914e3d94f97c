//! Small helpers over tree-sitter-go nodes.

use tree_sitter::Node;

pub fn text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or("")
}

pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// Items of an `expression_list`, or the node itself.
pub fn expression_items(node: Node<'_>) -> Vec<Node<'_>> {
    if node.kind() == "expression_list" {
        named_children(node)
    } else {
        vec![node]
    }
}

pub fn field_children<'a>(node: Node<'a>, field: &str) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

pub fn strip_parens(mut node: Node<'_>) -> Node<'_> {
    while node.kind() == "parenthesized_expression" {
        match named_children(node).into_iter().next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Statements of a block, looking through `statement_list`.
pub fn statements(block: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    for child in named_children(block) {
        if child.kind() == "statement_list" {
            out.extend(named_children(child));
        } else {
            out.push(child);
        }
    }
    out
}

pub fn call_arguments(call: Node<'_>) -> Vec<Node<'_>> {
    call.child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default()
}

/// Declared result types of a function, one entry per result position.
pub fn result_types(decl: Node<'_>) -> Vec<Node<'_>> {
    let Some(result) = decl.child_by_field_name("result") else {
        return Vec::new();
    };
    if result.kind() != "parameter_list" {
        return vec![result];
    }
    let mut out = Vec::new();
    for param in named_children(result) {
        let Some(ty) = param.child_by_field_name("type") else {
            continue;
        };
        let names = field_children(param, "name").len().max(1);
        out.extend((0..names).map(|_| ty));
    }
    out
}

/// Declared parameter types, one entry per parameter name.
pub fn parameter_types(decl: Node<'_>) -> Vec<Node<'_>> {
    let Some(params) = decl.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for param in named_children(params) {
        let Some(ty) = param.child_by_field_name("type") else {
            continue;
        };
        let names = field_children(param, "name").len().max(1);
        out.extend((0..names).map(|_| ty));
    }
    out
}

/// Name of the receiver's base type: `func (c *CLI) Run()` gives `CLI`.
pub fn receiver_type_name<'a>(decl: Node<'_>, source: &'a str) -> Option<&'a str> {
    let receiver = decl.child_by_field_name("receiver")?;
    let param = named_children(receiver).into_iter().next()?;
    let mut ty = param.child_by_field_name("type")?;
    loop {
        match ty.kind() {
            "pointer_type" | "parenthesized_type" => {
                ty = named_children(ty).into_iter().next()?;
            }
            "generic_type" => ty = ty.child_by_field_name("type")?,
            "type_identifier" => return Some(text(ty, source)),
            _ => return None,
        }
    }
}

pub fn is_string_literal(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "interpreted_string_literal" | "raw_string_literal"
    )
}

/// Value of a Go string literal with the common escapes decoded.
pub fn string_literal_value(node: Node<'_>, source: &str) -> String {
    let raw = text(node, source);
    if node.kind() == "raw_string_literal" {
        return crate::utils::unquote_string(raw);
    }
    let inner = crate::utils::unquote_string(raw);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Calls nested under `node` in lexical order, not descending into
/// function literals.
pub fn calls_outside_closures(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    collect_calls(node, &mut out);
    out
}

fn collect_calls<'a>(node: Node<'a>, out: &mut Vec<Node<'a>>) {
    if node.kind() == "call_expression" {
        out.push(node);
    }
    for child in named_children(node) {
        if child.kind() != "func_literal" {
            collect_calls(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    fn first_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        children.into_iter().find_map(|c| first_of_kind(c, kind))
    }

    #[test]
    fn test_result_types_expands_named_results() {
        let source = "package p\nfunc f() (a, b string, ok bool) { return }\n";
        let tree = parse(source);
        let decl = first_of_kind(tree.root_node(), "function_declaration").unwrap();
        let types: Vec<_> = result_types(decl)
            .into_iter()
            .map(|t| text(t, source))
            .collect();
        assert_eq!(types, vec!["string", "string", "bool"]);
    }

    #[test]
    fn test_result_types_single() {
        let source = "package p\nfunc f() schema.GroupVersionResource { return x }\n";
        let tree = parse(source);
        let decl = first_of_kind(tree.root_node(), "function_declaration").unwrap();
        let types = result_types(decl);
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].kind(), "qualified_type");
    }

    #[test]
    fn test_receiver_type_name() {
        let source = "package p\nfunc (c *CLI) Run() {}\n";
        let tree = parse(source);
        let decl = first_of_kind(tree.root_node(), "method_declaration").unwrap();
        assert_eq!(receiver_type_name(decl, source), Some("CLI"));
    }

    #[test]
    fn test_string_literal_value() {
        let source = "package p\nvar a = \"x\\ty\"\nvar b = `raw\\n`\n";
        let tree = parse(source);
        let interpreted = first_of_kind(tree.root_node(), "interpreted_string_literal").unwrap();
        let raw = first_of_kind(tree.root_node(), "raw_string_literal").unwrap();
        assert_eq!(string_literal_value(interpreted, source), "x\ty");
        assert_eq!(string_literal_value(raw, source), "raw\\n");
    }

    #[test]
    fn test_calls_outside_closures_skips_func_literals() {
        let source = "package p\nfunc f() { a(b(), func() { c() }) }\n";
        let tree = parse(source);
        let body = first_of_kind(tree.root_node(), "block").unwrap();
        let names: Vec<_> = calls_outside_closures(body)
            .into_iter()
            .map(|c| text(c.child_by_field_name("function").unwrap(), source))
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
