//! Program model for a Go corpus built from tree-sitter syntax.
//!
//! The model owns every parsed file. Everything downstream borrows
//! [`Located`] handles into it and never mutates it.

pub mod callgraph;
pub mod identity;
pub mod imports;
pub mod loader;
pub mod scope;
pub mod syntax;
pub mod types;

pub use callgraph::{CallEdge, CallGraph, GraphNode, SiteKind, TestRoot};
pub use identity::{FunctionIdentity, Location};
pub use imports::ImportMap;
pub use loader::CorpusLoader;
pub use scope::Binding;
pub use types::{Origin, TypeOracle};

use crate::error::ParserError;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tree_sitter::{Node, Parser, Tree};

pub struct SourceFile {
    /// Path relative to the corpus root, `/` separated.
    pub path: String,
    pub package_name: String,
    pub package: usize,
    pub source: String,
    pub tree: Tree,
    pub imports: ImportMap,
    /// `//go:build` expression, or the GOOS/GOARCH suffix of the file name.
    pub build_constraint: Option<String>,
}

impl SourceFile {
    pub fn root(&self) -> Located<'_> {
        Located::new(self, self.tree.root_node())
    }

    pub fn is_test_file(&self) -> bool {
        self.path.ends_with("_test.go")
    }
}

/// A syntax node together with the file it belongs to.
#[derive(Clone, Copy)]
pub struct Located<'a> {
    pub file: &'a SourceFile,
    pub node: Node<'a>,
}

impl<'a> Located<'a> {
    pub fn new(file: &'a SourceFile, node: Node<'a>) -> Self {
        Self { file, node }
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    pub fn text(&self) -> &'a str {
        syntax::text(self.node, &self.file.source)
    }

    pub fn location(&self) -> Location {
        Location::new(
            self.file.path.clone(),
            self.node.start_position().row + 1,
        )
    }

    pub fn with(&self, node: Node<'a>) -> Located<'a> {
        Located::new(self.file, node)
    }

    pub fn child(&self, field: &str) -> Option<Located<'a>> {
        self.node.child_by_field_name(field).map(|n| self.with(n))
    }

    pub fn named_children(&self) -> Vec<Located<'a>> {
        syntax::named_children(self.node)
            .into_iter()
            .map(|n| self.with(n))
            .collect()
    }

    /// Items of an `expression_list`, or the node itself.
    pub fn expression_items(&self) -> Vec<Located<'a>> {
        syntax::expression_items(self.node)
            .into_iter()
            .map(|n| self.with(n))
            .collect()
    }

    pub fn strip_parens(&self) -> Located<'a> {
        self.with(syntax::strip_parens(self.node))
    }

    /// First line of the node text, shortened for diagnostics.
    pub fn snippet(&self) -> String {
        let line = self.text().lines().next().unwrap_or("");
        if line.chars().count() > 80 {
            let short: String = line.chars().take(77).collect();
            format!("{short}...")
        } else {
            line.to_string()
        }
    }

    pub fn package(&self) -> usize {
        self.file.package
    }
}

impl std::fmt::Debug for Located<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.kind(), self.location())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeclRef {
    pub file: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    kind: &'static str,
}

impl DeclRef {
    fn of(file: usize, node: Node<'_>) -> Self {
        Self {
            file,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            kind: node.kind(),
        }
    }
}

/// Top-level declarations of one package.
#[derive(Debug, Default)]
pub struct DeclIndex {
    functions: HashMap<String, DeclRef>,
    methods: HashMap<(String, String), DeclRef>,
    values: HashMap<String, DeclRef>,
    types: HashMap<String, DeclRef>,
}

impl DeclIndex {
    fn add_file(&mut self, file_idx: usize, file: &SourceFile) {
        let source = file.source.as_str();
        for decl in syntax::named_children(file.tree.root_node()) {
            match decl.kind() {
                "function_declaration" => {
                    if let Some(name) = decl.child_by_field_name("name") {
                        self.functions.insert(
                            syntax::text(name, source).to_string(),
                            DeclRef::of(file_idx, decl),
                        );
                    }
                }
                "method_declaration" => {
                    let receiver = syntax::receiver_type_name(decl, source);
                    let name = decl.child_by_field_name("name");
                    if let (Some(receiver), Some(name)) = (receiver, name) {
                        self.methods.insert(
                            (receiver.to_string(), syntax::text(name, source).to_string()),
                            DeclRef::of(file_idx, decl),
                        );
                    }
                }
                "var_declaration" | "const_declaration" => {
                    for spec in value_specs(decl) {
                        for name in syntax::field_children(spec, "name") {
                            self.values.insert(
                                syntax::text(name, source).to_string(),
                                DeclRef::of(file_idx, spec),
                            );
                        }
                    }
                }
                "type_declaration" => {
                    for spec in syntax::named_children(decl) {
                        if let Some(name) = spec.child_by_field_name("name") {
                            self.types.insert(
                                syntax::text(name, source).to_string(),
                                DeclRef::of(file_idx, spec),
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }

    pub fn function_count(&self) -> usize {
        self.functions.len() + self.methods.len()
    }
}

/// `var_spec`/`const_spec` nodes of a declaration, looking through spec lists.
pub fn value_specs(decl: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    for child in syntax::named_children(decl) {
        match child.kind() {
            "var_spec" | "const_spec" => out.push(child),
            "var_spec_list" | "const_spec_list" => out.extend(
                syntax::named_children(child)
                    .into_iter()
                    .filter(|c| matches!(c.kind(), "var_spec" | "const_spec")),
            ),
            _ => {}
        }
    }
    out
}

#[derive(Debug)]
pub struct Package {
    pub import_path: String,
    pub name: String,
    pub dir: String,
    pub files: Vec<usize>,
    index: DeclIndex,
}

impl Package {
    pub fn index(&self) -> &DeclIndex {
        &self.index
    }
}

pub struct Corpus {
    root: PathBuf,
    module_path: String,
    files: Vec<SourceFile>,
    packages: Vec<Package>,
    by_import_path: HashMap<String, usize>,
}

impl Corpus {
    /// Parses `(relative path, source)` pairs into a corpus rooted at `root`.
    pub fn from_sources(
        root: impl Into<PathBuf>,
        module_path: impl Into<String>,
        mut sources: Vec<(String, String)>,
    ) -> Result<Self, ParserError> {
        let module_path = module_path.into();
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        let parsed = sources
            .into_par_iter()
            .map(|(path, source)| {
                let tree = parse_go(&path, &source)?;
                Ok((path, source, tree))
            })
            .collect::<Result<Vec<_>, ParserError>>()?;

        let mut files = Vec::with_capacity(parsed.len());
        let mut packages: Vec<Package> = Vec::new();
        let mut by_import_path: HashMap<String, usize> = HashMap::new();

        for (path, source, tree) in parsed {
            if tree.root_node().has_error() {
                warn!(file = %path, "syntax errors in file, analysing what parsed");
            }

            let package_name = package_clause(&tree, &source).unwrap_or_default();
            let imports = imports::extract(&tree, source.as_bytes());
            let build_constraint = build_constraint(&path, &source);
            let dir = Path::new(&path)
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();

            let mut import_path = if dir.is_empty() {
                module_path.clone()
            } else {
                format!("{module_path}/{dir}")
            };
            if package_name.ends_with("_test") {
                import_path.push_str("_test");
            }

            let package = *by_import_path.entry(import_path.clone()).or_insert_with(|| {
                packages.push(Package {
                    import_path,
                    name: package_name.clone(),
                    dir: dir.clone(),
                    files: Vec::new(),
                    index: DeclIndex::default(),
                });
                packages.len() - 1
            });

            let file_idx = files.len();
            files.push(SourceFile {
                path,
                package_name,
                package,
                source,
                tree,
                imports,
                build_constraint,
            });
            packages[package].files.push(file_idx);
        }

        for (file_idx, file) in files.iter().enumerate() {
            packages[file.package].index.add_file(file_idx, file);
        }

        debug!(
            files = files.len(),
            packages = packages.len(),
            module = %module_path,
            "corpus indexed"
        );

        Ok(Self {
            root: root.into(),
            module_path,
            files,
            packages,
            by_import_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, idx: usize) -> &SourceFile {
        &self.files[idx]
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn package(&self, idx: usize) -> &Package {
        &self.packages[idx]
    }

    pub fn package_by_path(&self, import_path: &str) -> Option<&Package> {
        self.by_import_path
            .get(import_path)
            .map(|&idx| &self.packages[idx])
    }

    pub fn import_path_of(&self, file: &SourceFile) -> &str {
        &self.packages[file.package].import_path
    }

    pub fn find_function(&self, import_path: &str, name: &str) -> Option<Located<'_>> {
        let package = self.package_by_path(import_path)?;
        let decl = package.index.functions.get(name)?;
        self.resolve_decl(decl)
    }

    pub fn find_method(
        &self,
        import_path: &str,
        receiver: &str,
        name: &str,
    ) -> Option<Located<'_>> {
        let package = self.package_by_path(import_path)?;
        let decl = package
            .index
            .methods
            .get(&(receiver.to_string(), name.to_string()))?;
        self.resolve_decl(decl)
    }

    /// The `var_spec`/`const_spec` declaring a package-level name.
    pub fn find_value_spec(&self, import_path: &str, name: &str) -> Option<Located<'_>> {
        let package = self.package_by_path(import_path)?;
        let decl = package.index.values.get(name)?;
        self.resolve_decl(decl)
    }

    pub fn find_type_spec(&self, import_path: &str, name: &str) -> Option<Located<'_>> {
        let package = self.package_by_path(import_path)?;
        let decl = package.index.types.get(name)?;
        self.resolve_decl(decl)
    }

    pub fn declaration(&self, identity: &FunctionIdentity) -> Option<Located<'_>> {
        if identity.is_method() {
            self.find_method(&identity.module, &identity.receiver, &identity.function)
        } else {
            self.find_function(&identity.module, &identity.function)
        }
    }

    pub fn function_count(&self) -> usize {
        self.packages.iter().map(|p| p.index.function_count()).sum()
    }

    fn resolve_decl(&self, decl: &DeclRef) -> Option<Located<'_>> {
        let file = self.files.get(decl.file)?;
        let mut node = file
            .tree
            .root_node()
            .descendant_for_byte_range(decl.start_byte, decl.end_byte)?;
        while node.kind() != decl.kind {
            node = node.parent()?;
        }
        Some(Located::new(file, node))
    }
}

pub fn parse_go(path: &str, source: &str) -> Result<Tree, ParserError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|_| ParserError::language_setup_failed("go"))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ParserError::parse_failed(path))
}

fn package_clause(tree: &Tree, source: &str) -> Option<String> {
    let root = tree.root_node();
    let clause = syntax::named_children(root)
        .into_iter()
        .find(|n| n.kind() == "package_clause")?;
    let name = syntax::named_children(clause).into_iter().next()?;
    Some(syntax::text(name, source).to_string())
}

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "arm", "arm64", "loong64", "mips", "mips64", "mips64le", "mipsle", "ppc64",
    "ppc64le", "riscv64", "s390x", "wasm",
];

/// Build constraint a file is compiled under. An explicit `//go:build` (or
/// legacy `// +build`) line in the header wins over the file name suffix.
fn build_constraint(path: &str, source: &str) -> Option<String> {
    for line in source.lines().map(str::trim) {
        if line.starts_with("package ") {
            break;
        }
        let expr = line
            .strip_prefix("//go:build ")
            .or_else(|| line.strip_prefix("// +build "));
        if let Some(expr) = expr {
            return Some(expr.trim().to_string());
        }
    }

    let stem = Path::new(path).file_stem()?.to_str()?;
    let stem = stem.strip_suffix("_test").unwrap_or(stem);
    // The first element is the base name; `linux.go` alone is unconstrained.
    let parts: Vec<&str> = stem.split('_').skip(1).collect();
    match parts.as_slice() {
        [.., os, arch] if KNOWN_OS.contains(os) && KNOWN_ARCH.contains(arch) => {
            Some(format!("{os}_{arch}"))
        }
        [.., last] if KNOWN_OS.contains(last) || KNOWN_ARCH.contains(last) => {
            Some(last.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Corpus;

    pub const MODULE: &str = "example.com/e2e";

    /// Builds an in-memory corpus from `(relative path, source)` pairs.
    pub fn corpus(files: &[(&str, &str)]) -> Corpus {
        let sources = files
            .iter()
            .map(|(p, s)| (p.to_string(), s.to_string()))
            .collect();
        Corpus::from_sources("/corpus", MODULE, sources).unwrap()
    }
}
