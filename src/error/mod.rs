mod analysis;
mod config;
mod io;
mod parser;
mod resolve;

pub use analysis::{AnalysisError, TraversalError};
pub use config::ConfigError;
pub use io::IoError;
pub use parser::ParserError;
pub use resolve::ResolveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),
}

pub type Result<T> = std::result::Result<T, Error>;
