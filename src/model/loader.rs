use super::Corpus;
use crate::error::{IoError, ParserError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const FILE_EXTENSION: &str = "go";

pub const EXCLUDED_DIRS: &[&str] = &["vendor", "testdata", ".git"];

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Reads a Go module from disk into a [`Corpus`].
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    excluded_dirs: Vec<String>,
    exclude_hidden: bool,
}

impl Default for CorpusLoader {
    fn default() -> Self {
        Self {
            excluded_dirs: EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            exclude_hidden: true,
        }
    }
}

impl CorpusLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_excluded_dir(mut self, dir: impl Into<String>) -> Self {
        self.excluded_dirs.push(dir.into());
        self
    }

    pub fn load(&self, root: &Path) -> Result<Corpus> {
        if !root.is_dir() {
            return Err(IoError::directory_not_found(root).into());
        }

        let module_path = match read_module_path(root)? {
            Some(module) => module,
            None => {
                let fallback = root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                warn!(
                    root = %root.display(),
                    module = %fallback,
                    "no go.mod found, using directory name as module path"
                );
                fallback
            }
        };

        let paths = self.walk_source_files(root)?;
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let size = fs::metadata(&path)
                .map_err(|e| IoError::read_error(&path, e))?
                .len();
            if size > MAX_FILE_SIZE {
                warn!(file = %path.display(), size, "skipping oversized file");
                continue;
            }
            let source = fs::read_to_string(&path).map_err(|e| IoError::read_error(&path, e))?;
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            sources.push((relative, source));
        }

        info!(
            root = %root.display(),
            module = %module_path,
            files = sources.len(),
            "loading corpus"
        );
        Ok(Corpus::from_sources(root, module_path, sources)?)
    }

    fn walk_source_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if self.exclude_hidden && name.starts_with('.') {
                return false;
            }
            !self.excluded_dirs.iter().any(|d| d == name.as_ref())
        }) {
            let entry = entry.map_err(|e| IoError::scan_error(root, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if self.exclude_hidden && entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.path().extension().is_some_and(|ext| ext == FILE_EXTENSION) {
                files.push(entry.into_path());
            }
        }

        debug!(count = files.len(), "found Go source files");
        Ok(files)
    }
}

/// Module path declared in `<root>/go.mod`, if the file exists.
pub fn read_module_path(root: &Path) -> Result<Option<String>> {
    let go_mod = root.join("go.mod");
    if !go_mod.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&go_mod).map_err(|e| IoError::read_error(&go_mod, e))?;
    parse_module_directive(&content)
        .map(Some)
        .ok_or_else(|| ParserError::invalid_module_file(&go_mod, "missing module directive").into())
}

fn parse_module_directive(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = crate::utils::unquote_string(rest.trim());
        (!module.is_empty()).then_some(module)
    })
}
