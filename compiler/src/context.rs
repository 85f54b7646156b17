use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
pub use tokio_util::sync::CancellationToken;
use crate::{
    error::FbsError,
    schema::SchemaFile,
};

/// Fails with `Cancelled` once `token` has been cancelled. The resolver calls
/// this once per declaration.
pub fn check_cancelled(token: &CancellationToken) -> Result<(), FbsError> {
    if token.is_cancelled() {
        Err(FbsError::Cancelled)
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Extra directories searched for `include` targets, after the including
    /// file's own directory.
    pub include_dirs: Vec<PathBuf>,
    pub cancel:       CancellationToken,
}

/// Where schema text comes from and how `include` paths map to file
/// identities.
pub trait SourceLoader {
    /// Resolves `include` as written in `includer` (or a root file when
    /// `includer` is `None`) to the path that identifies the file.
    fn resolve(&self, includer: Option<&Path>, include: &str) -> Result<PathBuf, FbsError>;

    fn load(&self, path: &Path) -> Result<String, FbsError>;
}

/// Reads schemas from disk. Resolved paths are canonicalized, so the same
/// file reached through different relative paths is compiled once.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    pub include_dirs: Vec<PathBuf>,
}

impl FsLoader {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        FsLoader { include_dirs }
    }

    fn candidates(&self, includer: Option<&Path>, include: &str) -> Vec<PathBuf> {
        let path = Path::new(include);
        if path.is_absolute() {
            return vec![path.to_path_buf()];
        }
        let mut candidates = Vec::new();
        if let Some(dir) = includer.and_then(Path::parent) {
            candidates.push(dir.join(path));
        }
        if includer.is_some() {
            candidates.extend(self.include_dirs.iter().map(|dir| dir.join(path)));
        }
        candidates.push(path.to_path_buf());
        candidates
    }
}

impl SourceLoader for FsLoader {
    fn resolve(&self, includer: Option<&Path>, include: &str) -> Result<PathBuf, FbsError> {
        for candidate in self.candidates(includer, include) {
            if candidate.is_file() {
                return candidate
                    .canonicalize()
                    .map_err(|e| FbsError::io(&candidate, e));
            }
        }
        Err(FbsError::io(
            include,
            std::io::Error::new(std::io::ErrorKind::NotFound, "schema file not found"),
        ))
    }

    fn load(&self, path: &Path) -> Result<String, FbsError> {
        std::fs::read_to_string(path).map_err(|e| FbsError::io(path, e))
    }
}

/// Schemas held in memory, keyed by path exactly as written.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn resolve(&self, _includer: Option<&Path>, include: &str) -> Result<PathBuf, FbsError> {
        let path = PathBuf::from(include);
        if self.files.contains_key(&path) {
            Ok(path)
        } else {
            Err(FbsError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "schema file not found"),
            ))
        }
    }

    fn load(&self, path: &Path) -> Result<String, FbsError> {
        self.files.get(path).cloned().ok_or_else(|| {
            FbsError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "schema file not found"),
            )
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FileState {
    InProgress,
    Parsed(Arc<SchemaFile>),
}

/// Per-compilation state: the loader, the path → file cache and the
/// cancellation flag. Independent contexts share nothing.
pub struct CompilationContext<L: SourceLoader = FsLoader> {
    pub(crate) loader: L,
    pub(crate) files:  HashMap<PathBuf, FileState>,
    pub(crate) cancel: CancellationToken,
}

impl CompilationContext<FsLoader> {
    pub fn from_options(options: CompileOptions) -> Self {
        CompilationContext {
            loader: FsLoader::new(options.include_dirs),
            files:  HashMap::new(),
            cancel: options.cancel,
        }
    }
}

impl<L: SourceLoader> CompilationContext<L> {
    pub fn new(loader: L) -> Self {
        CompilationContext {
            loader,
            files:  HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A fully parsed file, if this context has compiled it.
    pub fn get(&self, path: &Path) -> Option<Arc<SchemaFile>> {
        match self.files.get(path) {
            Some(FileState::Parsed(file)) => Some(Arc::clone(file)),
            _ => None,
        }
    }

    pub fn parsed_files(&self) -> impl Iterator<Item = &Arc<SchemaFile>> {
        self.files.values().filter_map(|state| match state {
            FileState::Parsed(file) => Some(file),
            FileState::InProgress => None,
        })
    }

    /// Compiles a root schema file and everything it includes.
    pub fn compile(&mut self, path: impl AsRef<Path>) -> Result<Arc<SchemaFile>, FbsError> {
        let include = path.as_ref().to_string_lossy();
        let resolved = self.loader.resolve(None, &include)?;
        self.compile_file(resolved)
    }
}
