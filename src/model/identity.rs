use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a callable: package import path, receiver type name (empty for
/// plain functions) and function name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionIdentity {
    pub module: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receiver: String,
    pub function: String,
}

impl FunctionIdentity {
    pub fn new(
        module: impl Into<String>,
        receiver: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            receiver: receiver.into(),
            function: function.into(),
        }
    }

    pub fn function(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self::new(module, "", function)
    }

    pub fn is_method(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Map key used for deduplication: the fields joined with `#`.
    pub fn hash_key(&self) -> String {
        format!("{}#{}#{}", self.module, self.receiver, self.function)
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_method() {
            write!(f, "({}.{}).{}", self.module, self.receiver, self.function)
        } else {
            write!(f, "{}.{}", self.module, self.function)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
