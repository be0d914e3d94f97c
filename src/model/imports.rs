//! Go import extraction
//!
//! Handles Go import declarations:
//! - Simple: `import "k8s.io/client-go/dynamic"`
//! - Grouped: `import ("fmt" "strings")`
//! - Aliased: `import metav1 "k8s.io/apimachinery/pkg/apis/meta/v1"`
//! - Dot import: `import . "github.com/onsi/ginkgo/v2"`
//! - Blank import: `import _ "embed"`

use crate::utils::{package_name_from_path, unquote_string};
use std::collections::HashMap;
use tree_sitter::{Node, Tree};

#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    aliases: HashMap<String, String>,
    dot_imports: Vec<String>,
    blank_imports: Vec<String>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import path bound to a package name in this file.
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn dot_imports(&self) -> &[String] {
        &self.dot_imports
    }

    pub fn blank_imports(&self) -> &[String] {
        &self.blank_imports
    }

    pub fn len(&self) -> usize {
        self.aliases.len() + self.dot_imports.len() + self.blank_imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, alias: Option<String>, path: String) {
        match alias.as_deref() {
            Some(".") => self.dot_imports.push(path),
            Some("_") => self.blank_imports.push(path),
            Some(name) => {
                self.aliases.insert(name.to_string(), path);
            }
            None => {
                self.aliases.insert(package_name_from_path(&path), path);
            }
        }
    }
}

pub fn extract(tree: &Tree, source: &[u8]) -> ImportMap {
    let mut imports = ImportMap::new();
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "import_declaration" {
            process_import_declaration(child, source, &mut imports);
        }
    }
    imports
}

fn process_import_declaration(node: Node, source: &[u8], imports: &mut ImportMap) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_spec" => process_import_spec(child, source, imports),
            "import_spec_list" => {
                let mut list_cursor = child.walk();
                for spec in child.children(&mut list_cursor) {
                    if spec.kind() == "import_spec" {
                        process_import_spec(spec, source, imports);
                    }
                }
            }
            _ => {}
        }
    }
}

fn process_import_spec(node: Node, source: &[u8], imports: &mut ImportMap) {
    let mut alias: Option<String> = None;
    let mut path: Option<String> = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "package_identifier" | "blank_identifier" | "dot" => {
                alias = Some(child.utf8_text(source).unwrap_or("").to_string());
            }
            "interpreted_string_literal" | "raw_string_literal" => {
                path = Some(unquote_string(child.utf8_text(source).unwrap_or("")));
            }
            _ => {}
        }
    }

    if let Some(import_path) = path {
        imports.insert(alias, import_path);
    }
}
