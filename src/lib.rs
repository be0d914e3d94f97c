/// Test API Usage
///
/// Statically maps every test case of a Go test corpus to the external APIs
/// it exercises, following helper functions and recovering resource locators
/// from the syntax that builds them.
pub mod analysis;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod helpers;
pub mod logging;
pub mod model;
pub mod output;
pub mod traverse;
pub mod tree;
pub mod utils;

pub use analysis::{Analysis, Analyzer};
pub use config::AnalyzerConfig;
pub use engine::{LocatorTriple, LocatorType, ValueResolver};
pub use error::{Error, Result};
pub use model::{Corpus, CorpusLoader, FunctionIdentity};
pub use output::Report;
