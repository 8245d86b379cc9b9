//! Module loading: mapping dotted import paths to source files.

use std::path::{Path, PathBuf};

/// Why a module could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    NotFound { searched: PathBuf },
    Io(std::io::Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NotFound { searched } => {
                write!(f, "module not found (searched {})", searched.display())
            }
            LoadError::Io(err) => write!(f, "{err}"),
        }
    }
}

/// A successfully loaded module source.
pub struct LoadedModule {
    pub source: String,
    pub file: Option<PathBuf>,
}

/// Maps a dotted module path to source text.
///
/// The resolver calls this when an import references a module that has
/// not been registered in the current session.
pub trait ModuleLoader {
    fn load(&mut self, path: &[String]) -> Result<LoadedModule, LoadError>;
}

/// Filesystem loader: `a.b.c` becomes `<root>/a/b/c.ki`.
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A loader rooted at the directory containing `file`, so sibling
    /// modules of the entry file resolve naturally.
    pub fn for_file(file: &Path) -> Self {
        let root = file.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::new(root)
    }

    fn file_for(&self, path: &[String]) -> PathBuf {
        let mut file = self.root.clone();
        for segment in path {
            file.push(segment);
        }
        file.set_extension("ki");
        file
    }
}

impl ModuleLoader for FsLoader {
    fn load(&mut self, path: &[String]) -> Result<LoadedModule, LoadError> {
        let file = self.file_for(path);
        if !file.exists() {
            return Err(LoadError::NotFound { searched: file });
        }
        let source = std::fs::read_to_string(&file).map_err(LoadError::Io)?;
        Ok(LoadedModule {
            source,
            file: Some(file),
        })
    }
}

/// A loader for single-file sessions: every load fails as not-found.
pub struct NoLoader;

impl ModuleLoader for NoLoader {
    fn load(&mut self, path: &[String]) -> Result<LoadedModule, LoadError> {
        Err(LoadError::NotFound {
            searched: PathBuf::from(format!("{}.ki", path.join("/"))),
        })
    }
}

/// An in-memory loader for tests: module path -> source text.
pub struct MemoryLoader {
    modules: Vec<(Vec<String>, String)>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    pub fn add(&mut self, path: &[&str], source: impl Into<String>) {
        self.modules.push((
            path.iter().map(|s| s.to_string()).collect(),
            source.into(),
        ));
    }
}

impl Default for MemoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for MemoryLoader {
    fn load(&mut self, path: &[String]) -> Result<LoadedModule, LoadError> {
        for (module_path, source) in &self.modules {
            if module_path == path {
                return Ok(LoadedModule {
                    source: source.clone(),
                    file: None,
                });
            }
        }
        Err(LoadError::NotFound {
            searched: PathBuf::from(format!("{}.ki", path.join("/"))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_loader_maps_dotted_paths() {
        let loader = FsLoader::new("/project/src");
        let file = loader.file_for(&["a".into(), "b".into(), "c".into()]);
        assert_eq!(file, PathBuf::from("/project/src/a/b/c.ki"));
    }

    #[test]
    fn memory_loader_round_trip() {
        let mut loader = MemoryLoader::new();
        loader.add(&["util"], "pub fn id(x: i32) -> i32 { return x }");
        let loaded = loader.load(&["util".to_string()]).unwrap();
        assert!(loaded.source.contains("fn id"));
        assert!(loader.load(&["missing".to_string()]).is_err());
    }
}
