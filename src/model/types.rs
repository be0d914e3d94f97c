//! Syntax-level static typing: callee identities and value origins.

use super::{scope, syntax, Binding, Corpus, FunctionIdentity, Located};
use std::collections::HashMap;

const MAX_ORIGIN_DEPTH: usize = 32;

const BUILTINS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make", "max",
    "min", "new", "panic", "print", "println", "real", "recover",
];

const BUILTIN_TYPES: &[&str] = &[
    "any", "bool", "byte", "complex128", "complex64", "error", "float32", "float64", "int",
    "int16", "int32", "int64", "int8", "rune", "string", "uint", "uint16", "uint32", "uint64",
    "uint8", "uintptr",
];

/// Where a value comes from, as far as syntax can tell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The identifier names an imported package.
    Package(String),
    /// A value of a named type.
    Named { module: String, type_name: String },
    /// A value produced by a module whose type is not visible.
    Module(String),
}

impl Origin {
    pub fn module(&self) -> &str {
        match self {
            Origin::Package(m) | Origin::Module(m) => m,
            Origin::Named { module, .. } => module,
        }
    }
}

pub struct TypeOracle<'a> {
    corpus: &'a Corpus,
    /// Names exported by dot-imported modules outside the corpus, keyed by name.
    dot_hints: HashMap<String, Vec<String>>,
}

impl<'a> TypeOracle<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self {
            corpus,
            dot_hints: HashMap::new(),
        }
    }

    /// Declares that modules under `module_prefix` export `names`, so a bare
    /// call through a dot import can be attributed to them.
    pub fn with_dot_import_hint<I, S>(mut self, module_prefix: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.dot_hints
                .entry(name.as_ref().to_string())
                .or_default()
                .push(module_prefix.to_string());
        }
        self
    }

    pub fn corpus(&self) -> &'a Corpus {
        self.corpus
    }

    pub fn is_corpus_module(&self, module: &str) -> bool {
        self.corpus.package_by_path(module).is_some()
    }

    /// Identity of the function a call expression invokes, if it names one.
    pub fn callee(&self, call: Located<'a>) -> Option<FunctionIdentity> {
        self.callee_at(call, 0)
    }

    fn callee_at(&self, call: Located<'a>, depth: usize) -> Option<FunctionIdentity> {
        if depth >= MAX_ORIGIN_DEPTH {
            return None;
        }
        let function = call.child("function")?.strip_parens();
        match function.kind() {
            "identifier" => self.bare_callee(function),
            "selector_expression" => {
                let operand = function.child("operand")?.strip_parens();
                let field = function.child("field")?.text();
                if let Some(path) = self.package_alias(operand) {
                    return Some(FunctionIdentity::function(path, field));
                }
                match self.origin_at(operand, depth + 1)? {
                    Origin::Package(m) | Origin::Module(m) => {
                        Some(FunctionIdentity::function(m, field))
                    }
                    Origin::Named { module, type_name } => {
                        Some(FunctionIdentity::new(module, type_name, field))
                    }
                }
            }
            _ => None,
        }
    }

    fn bare_callee(&self, ident: Located<'a>) -> Option<FunctionIdentity> {
        let name = ident.text();
        let own = self.corpus.import_path_of(ident.file);
        if self.corpus.find_function(own, name).is_some() {
            return Some(FunctionIdentity::function(own, name));
        }
        if BUILTINS.contains(&name) || BUILTIN_TYPES.contains(&name) {
            return None;
        }
        if scope::lookup(self.corpus, ident).is_some() {
            return None;
        }

        let dots = ident.file.imports.dot_imports();
        if let Some(path) = dots
            .iter()
            .find(|p| self.corpus.find_function(p, name).is_some())
        {
            return Some(FunctionIdentity::function(path.as_str(), name));
        }
        if let Some(prefixes) = self.dot_hints.get(name) {
            if let Some(path) = dots
                .iter()
                .find(|p| prefixes.iter().any(|prefix| p.starts_with(prefix.as_str())))
            {
                return Some(FunctionIdentity::function(path.as_str(), name));
            }
        }
        let external: Vec<&String> = dots.iter().filter(|p| !self.is_corpus_module(p)).collect();
        match external.as_slice() {
            [only] => Some(FunctionIdentity::function(only.as_str(), name)),
            _ => None,
        }
    }

    /// Import path when `expr` is an identifier naming an imported package.
    pub fn package_alias(&self, expr: Located<'a>) -> Option<&'a str> {
        if expr.kind() != "identifier" {
            return None;
        }
        let path = expr.file.imports.get(expr.text())?;
        if scope::lookup(self.corpus, expr).is_some() {
            return None;
        }
        Some(path)
    }

    pub fn origin(&self, expr: Located<'a>) -> Option<Origin> {
        self.origin_at(expr, 0)
    }

    fn origin_at(&self, expr: Located<'a>, depth: usize) -> Option<Origin> {
        if depth >= MAX_ORIGIN_DEPTH {
            return None;
        }
        let expr = expr.strip_parens();
        match expr.kind() {
            "identifier" => {
                if let Some(path) = self.package_alias(expr) {
                    return Some(Origin::Package(path.to_string()));
                }
                self.binding_origin(scope::lookup(self.corpus, expr)?, depth)
            }
            "call_expression" => self.call_result_origin(expr, 0, depth),
            "selector_expression" => {
                let operand = expr.child("operand")?.strip_parens();
                let field = expr.child("field")?.text();
                if let Some(path) = self.package_alias(operand) {
                    if self.is_corpus_module(path) {
                        let binding = scope::package_binding(self.corpus, path, field)?;
                        return self.binding_origin(binding, depth + 1);
                    }
                    return Some(Origin::Module(path.to_string()));
                }
                match self.origin_at(operand, depth + 1)? {
                    Origin::Named { module, type_name } if self.is_corpus_module(&module) => self
                        .field_type(&module, &type_name, field)
                        .and_then(|ty| self.type_origin(ty))
                        .or(Some(Origin::Module(module))),
                    other => Some(Origin::Module(other.module().to_string())),
                }
            }
            "composite_literal" => self.type_origin(expr.child("type")?),
            "unary_expression" => {
                let operator = expr.child("operator")?.text();
                if operator == "&" || operator == "*" {
                    self.origin_at(expr.child("operand")?, depth + 1)
                } else {
                    None
                }
            }
            "type_assertion_expression" | "type_conversion_expression" => {
                self.type_origin(expr.child("type")?)
            }
            _ => None,
        }
    }

    fn binding_origin(&self, binding: Binding<'a>, depth: usize) -> Option<Origin> {
        match binding {
            Binding::Value {
                expr,
                result_index,
                declared_type,
            } => {
                if let Some(ty) = declared_type {
                    return self.type_origin(ty);
                }
                match result_index {
                    Some(index) if expr.kind() == "call_expression" => {
                        self.call_result_origin(expr, index, depth + 1)
                    }
                    _ => self.origin_at(expr, depth + 1),
                }
            }
            Binding::Parameter { declared_type } | Binding::Declared { declared_type } => {
                self.type_origin(declared_type)
            }
            Binding::Range { .. } => None,
        }
    }

    fn call_result_origin(&self, call: Located<'a>, index: usize, depth: usize) -> Option<Origin> {
        let function = call.child("function")?.strip_parens();
        if function.kind() == "identifier" && function.text() == "new" {
            let arg = call
                .child("arguments")?
                .named_children()
                .into_iter()
                .next()?;
            return self.type_origin(arg);
        }

        let callee = self.callee_at(call, depth + 1)?;
        if !self.is_corpus_module(&callee.module) {
            return Some(Origin::Module(callee.module));
        }
        let decl = self.corpus.declaration(&callee)?;
        let result = syntax::result_types(decl.node).into_iter().nth(index)?;
        self.type_origin(decl.with(result))
    }

    /// Origin of values of the type expression `ty`.
    pub fn type_origin(&self, ty: Located<'a>) -> Option<Origin> {
        match ty.kind() {
            "qualified_type" => {
                let package = ty.child("package")?.text();
                let name = ty.child("name")?.text();
                let module = ty.file.imports.get(package)?;
                Some(Origin::Named {
                    module: module.to_string(),
                    type_name: name.to_string(),
                })
            }
            "type_identifier" => {
                let name = ty.text();
                if BUILTIN_TYPES.contains(&name) {
                    return None;
                }
                let own = self.corpus.import_path_of(ty.file);
                let module = if self.corpus.find_type_spec(own, name).is_some() {
                    own
                } else {
                    ty.file
                        .imports
                        .dot_imports()
                        .iter()
                        .find(|p| self.corpus.find_type_spec(p, name).is_some())
                        .map(String::as_str)
                        .unwrap_or(own)
                };
                Some(Origin::Named {
                    module: module.to_string(),
                    type_name: name.to_string(),
                })
            }
            "pointer_type" | "parenthesized_type" => {
                self.type_origin(ty.named_children().into_iter().next()?)
            }
            "generic_type" => self.type_origin(ty.child("type")?),
            _ => None,
        }
    }

    /// Whether the type expression `ty` names `module.type_name`, looking
    /// through pointers.
    pub fn is_named_type(&self, ty: Located<'a>, module: &str, type_name: &str) -> bool {
        matches!(
            self.type_origin(ty),
            Some(Origin::Named { module: m, type_name: t }) if m == module && t == type_name
        )
    }

    /// Declared type of a struct field on a corpus type.
    pub fn field_type(&self, module: &str, type_name: &str, field: &str) -> Option<Located<'a>> {
        let spec = self.corpus.find_type_spec(module, type_name)?;
        let body = spec.child("type")?;
        if body.kind() != "struct_type" {
            return None;
        }
        let list = body
            .named_children()
            .into_iter()
            .find(|c| c.kind() == "field_declaration_list")?;
        list.named_children().into_iter().find_map(|decl| {
            let names = syntax::field_children(decl.node, "name");
            names
                .iter()
                .any(|n| syntax::text(*n, &decl.file.source) == field)
                .then(|| decl.child("type"))
                .flatten()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{corpus, MODULE};

    fn calls<'a>(corpus: &'a Corpus, file: usize) -> Vec<Located<'a>> {
        let file = corpus.file(file);
        let mut out = Vec::new();
        collect(file.root(), &mut out);
        out
    }

    fn collect<'a>(node: Located<'a>, out: &mut Vec<Located<'a>>) {
        if node.kind() == "call_expression" {
            out.push(node);
        }
        for child in node.named_children() {
            collect(child, out);
        }
    }

    fn callee_of<'a>(oracle: &TypeOracle<'a>, calls: &[Located<'a>], text: &str) -> Option<FunctionIdentity> {
        let call = calls
            .iter()
            .find(|c| c.child("function").map(|f| f.text()) == Some(text))
            .unwrap();
        oracle.callee(*call)
    }

    const DYNAMIC: &str = "k8s.io/client-go/dynamic";

    #[test]
    fn test_package_selector_callee() {
        let corpus = corpus(&[(
            "p/p.go",
            "package p\nimport \"k8s.io/client-go/dynamic\"\nfunc f() { dynamic.NewForConfigOrDie(nil) }\n",
        )]);
        let oracle = TypeOracle::new(&corpus);
        let calls = calls(&corpus, 0);
        assert_eq!(
            callee_of(&oracle, &calls, "dynamic.NewForConfigOrDie"),
            Some(FunctionIdentity::function(DYNAMIC, "NewForConfigOrDie"))
        );
    }

    #[test]
    fn test_method_on_value_from_external_constructor() {
        let corpus = corpus(&[(
            "p/p.go",
            r#"package p
import "k8s.io/client-go/dynamic"
func f() {
    dc := dynamic.NewForConfigOrDie(nil)
    dc.Resource(gvr)
}
"#,
        )]);
        let oracle = TypeOracle::new(&corpus);
        let calls = calls(&corpus, 0);
        assert_eq!(
            callee_of(&oracle, &calls, "dc.Resource"),
            Some(FunctionIdentity::function(DYNAMIC, "Resource"))
        );
    }

    #[test]
    fn test_method_on_typed_parameter() {
        let corpus = corpus(&[(
            "p/p.go",
            "package p\nimport \"k8s.io/client-go/dynamic\"\nfunc f(dc dynamic.Interface) { dc.Resource(gvr) }\n",
        )]);
        let oracle = TypeOracle::new(&corpus);
        let calls = calls(&corpus, 0);
        assert_eq!(
            callee_of(&oracle, &calls, "dc.Resource"),
            Some(FunctionIdentity::new(DYNAMIC, "Interface", "Resource"))
        );
    }

    #[test]
    fn test_corpus_method_through_constructor_result() {
        let corpus = corpus(&[
            (
                "util/cli.go",
                "package util\ntype CLI struct{}\nfunc NewCLI() *CLI { return &CLI{} }\nfunc (c *CLI) Run() {}\n",
            ),
            (
                "e2e/e2e.go",
                "package e2e\nimport \"example.com/e2e/util\"\nvar oc = util.NewCLI()\nfunc f() { oc.Run() }\n",
            ),
        ]);
        let oracle = TypeOracle::new(&corpus);
        let calls = calls(&corpus, 0);
        assert_eq!(
            callee_of(&oracle, &calls, "oc.Run"),
            Some(FunctionIdentity::new(format!("{MODULE}/util"), "CLI", "Run"))
        );
    }

    #[test]
    fn test_local_and_builtin_calls() {
        let corpus = corpus(&[(
            "p/p.go",
            "package p\nfunc helper() {}\nfunc f() { helper(); _ = len(x); fn := func() {}; fn() }\n",
        )]);
        let oracle = TypeOracle::new(&corpus);
        let calls = calls(&corpus, 0);
        assert_eq!(
            callee_of(&oracle, &calls, "helper"),
            Some(FunctionIdentity::function(format!("{MODULE}/p"), "helper"))
        );
        assert_eq!(callee_of(&oracle, &calls, "len"), None);
        assert_eq!(callee_of(&oracle, &calls, "fn"), None);
    }

    #[test]
    fn test_dot_import_hint_picks_framework() {
        let corpus = corpus(&[(
            "p/p_test.go",
            r#"package p
import (
    . "github.com/onsi/ginkgo/v2"
    . "github.com/onsi/gomega"
)
var _ = Describe("x", func() {})
"#,
        )]);
        let oracle = TypeOracle::new(&corpus)
            .with_dot_import_hint("github.com/onsi/ginkgo", ["Describe", "It"]);
        let calls = calls(&corpus, 0);
        assert_eq!(
            callee_of(&oracle, &calls, "Describe"),
            Some(FunctionIdentity::function("github.com/onsi/ginkgo/v2", "Describe"))
        );

        let without_hint = TypeOracle::new(&corpus);
        assert_eq!(callee_of(&without_hint, &calls, "Describe"), None);
    }

    #[test]
    fn test_struct_field_origin() {
        let corpus = corpus(&[(
            "p/p.go",
            r#"package p
import "k8s.io/client-go/dynamic"
type Env struct {
    Client dynamic.Interface
}
func f(env *Env) { env.Client.Resource(gvr) }
"#,
        )]);
        let oracle = TypeOracle::new(&corpus);
        let calls = calls(&corpus, 0);
        assert_eq!(
            callee_of(&oracle, &calls, "env.Client.Resource"),
            Some(FunctionIdentity::new(DYNAMIC, "Interface", "Resource"))
        );
    }

    #[test]
    fn test_is_named_type() {
        let corpus = corpus(&[(
            "p/p.go",
            "package p\nimport \"k8s.io/apimachinery/pkg/runtime/schema\"\nvar g *schema.GroupVersionResource\n",
        )]);
        let oracle = TypeOracle::new(&corpus);
        let spec = corpus
            .find_value_spec(&format!("{MODULE}/p"), "g")
            .unwrap();
        let ty = spec.child("type").unwrap();
        assert!(oracle.is_named_type(
            ty,
            "k8s.io/apimachinery/pkg/runtime/schema",
            "GroupVersionResource"
        ));
    }
}
