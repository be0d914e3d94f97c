//! Analyzer configuration.
//!
//! Every field has a default describing a Ginkgo + client-go corpus, so an
//! empty file (or no file) is a valid configuration.

use crate::engine::LocatorType;
use crate::error::ConfigError;
use crate::model::FunctionIdentity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

pub const DEFAULT_MAX_PASSES: usize = 10;
pub const DEFAULT_MAX_RESOLVE_DEPTH: usize = crate::engine::DEFAULT_MAX_DEPTH;
pub const DEFAULT_MAX_TRAVERSAL_DEPTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub classifier: ClassifierConfig,
    /// Upper bound on helper closure passes before giving up.
    pub max_passes: usize,
    pub max_resolve_depth: usize,
    pub max_traversal_depth: usize,
    /// Union the children of helpers that share an identity instead of failing.
    pub merge_duplicate_helpers: bool,
    /// Count usages attached directly to a group towards every case below it.
    pub inherit_group_usages: bool,
    /// Keep the list of calls that were neither scopes, APIs nor helpers.
    pub collect_ignored: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            max_passes: DEFAULT_MAX_PASSES,
            max_resolve_depth: DEFAULT_MAX_RESOLVE_DEPTH,
            max_traversal_depth: DEFAULT_MAX_TRAVERSAL_DEPTH,
            merge_duplicate_helpers: false,
            inherit_group_usages: false,
            collect_ignored: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        trace!(path = %path.display(), "loading analyzer config");

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::read_error(path, e.to_string()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: Self = match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| ConfigError::parse_error(path, e.to_string()))?,
            "yaml" | "yml" => {
                if content.trim().is_empty() {
                    Self::default()
                } else {
                    serde_yaml::from_str(&content)
                        .map_err(|e| ConfigError::parse_error(path, e.to_string()))?
                }
            }
            _ => return Err(ConfigError::unsupported_format(extension)),
        };

        config.validate()?;
        debug!(path = %path.display(), "analyzer config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_passes == 0 {
            return Err(ConfigError::invalid("max_passes must be at least 1"));
        }
        if self.max_resolve_depth == 0 || self.max_traversal_depth == 0 {
            return Err(ConfigError::invalid("depth limits must be at least 1"));
        }
        if self.classifier.group_names.is_empty() || self.classifier.case_names.is_empty() {
            return Err(ConfigError::invalid(
                "at least one group name and one case name are required",
            ));
        }
        Ok(())
    }
}

/// Entry point whose target is given by a locator argument at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccessor {
    pub module_prefix: String,
    pub function: String,
}

impl Default for ResourceAccessor {
    fn default() -> Self {
        Self {
            module_prefix: "k8s.io/client-go/dynamic".to_string(),
            function: "Resource".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    pub framework_modules: Vec<String>,
    pub group_names: Vec<String>,
    pub case_names: Vec<String>,
    /// `module.Function` names whose first argument is a format string.
    pub format_functions: Vec<String>,
    pub recover_function: String,
    pub api_module_prefixes: Vec<String>,
    pub resource_accessor: ResourceAccessor,
    pub locator: LocatorType,
    /// Module prefixes counted as in-repository. Empty means the loaded
    /// module path.
    pub corpus_module_prefixes: Vec<String>,
    /// When set, locators whose domain matches none of these are dropped.
    pub domain_suffixes: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let with_variants = |names: &[&str]| {
            names
                .iter()
                .flat_map(|n| [n.to_string(), format!("F{n}"), format!("P{n}"), format!("X{n}")])
                .collect::<Vec<_>>()
        };

        Self {
            framework_modules: vec![
                "github.com/onsi/ginkgo".to_string(),
                "github.com/onsi/ginkgo/v2".to_string(),
            ],
            group_names: with_variants(&["Describe", "Context", "When"]),
            case_names: with_variants(&["It", "Specify"]),
            format_functions: vec!["fmt.Sprintf".to_string()],
            recover_function: "GinkgoRecover".to_string(),
            api_module_prefixes: vec![
                "k8s.io/client-go".to_string(),
                "github.com/openshift/client-go".to_string(),
            ],
            resource_accessor: ResourceAccessor::default(),
            locator: LocatorType::default(),
            corpus_module_prefixes: Vec::new(),
            domain_suffixes: Vec::new(),
        }
    }
}

impl ClassifierConfig {
    pub fn is_framework_module(&self, module: &str) -> bool {
        self.framework_modules
            .iter()
            .any(|m| has_module_prefix(module, m))
    }

    pub fn is_api_module(&self, module: &str) -> bool {
        self.api_module_prefixes
            .iter()
            .any(|m| has_module_prefix(module, m))
    }

    pub fn is_format_function(&self, id: &FunctionIdentity) -> bool {
        !id.is_method()
            && self
                .format_functions
                .iter()
                .any(|f| f.rsplit_once('.') == Some((id.module.as_str(), id.function.as_str())))
    }

    pub fn is_resource_accessor(&self, id: &FunctionIdentity) -> bool {
        id.function == self.resource_accessor.function
            && has_module_prefix(&id.module, &self.resource_accessor.module_prefix)
    }
}

/// `module` equals `prefix` or is a package below it.
pub fn has_module_prefix(module: &str, prefix: &str) -> bool {
    module
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
