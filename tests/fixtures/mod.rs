use std::path::PathBuf;

use test_api_usage::{Corpus, CorpusLoader};

pub const DYNAMIC_CLIENT: &str = "dynamic-client";
pub const FIXTURE_MODULE: &str = "github.com/example/e2e-suite";

/// Root of a Go fixture corpus under `tests/fixtures/go`.
pub fn go_fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("go")
        .join(name)
}

pub fn load_go_fixture(name: &str) -> Corpus {
    CorpusLoader::new()
        .load(&go_fixture_path(name))
        .expect("fixture corpus should load")
}

/// In-memory corpus from `(relative path, source)` pairs.
#[allow(dead_code)]
pub fn corpus_from(files: &[(&str, &str)]) -> Corpus {
    let sources = files
        .iter()
        .map(|(path, source)| (path.to_string(), source.to_string()))
        .collect();
    Corpus::from_sources("/corpus", "example.com/suite", sources).expect("sources should parse")
}
