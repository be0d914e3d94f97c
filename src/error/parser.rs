use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("failed to set parser language: {language}")]
    LanguageSetupFailed { language: String },

    #[error("failed to parse source code in {path}")]
    ParseFailed { path: PathBuf },

    #[error("invalid module file '{path}': {message}")]
    InvalidModuleFile { path: PathBuf, message: String },
}

impl ParserError {
    pub fn language_setup_failed(language: impl Into<String>) -> Self {
        Self::LanguageSetupFailed {
            language: language.into(),
        }
    }

    pub fn parse_failed(path: impl Into<PathBuf>) -> Self {
        Self::ParseFailed { path: path.into() }
    }

    pub fn invalid_module_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidModuleFile {
            path: path.into(),
            message: message.into(),
        }
    }
}
