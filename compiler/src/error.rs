use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FbsError>;

#[derive(Debug, Error)]
pub enum FbsError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Undefined type \"{name}\"")]
    UndefinedType { name: String },

    #[error("The type \"{name}\" is declared twice (in {} and {})", .first.display(), .second.display())]
    DuplicateType {
        name:   String,
        first:  PathBuf,
        second: PathBuf,
    },

    #[error("Field \"{field}\" is declared twice in \"{definition}\"")]
    DuplicateField { definition: String, field: String },

    #[error("{name} already set as \"{previous}\"")]
    DuplicateSingleton { name: &'static str, previous: String },

    #[error("Enum \"{name}\" has underlying type \"{underlying}\", but enum type must be integral")]
    InvalidEnumUnderlyingType { name: String, underlying: String },

    #[error("Unknown enum option on \"{name}\" (only `bit_flags` is allowed)")]
    InvalidEnumOption { name: String },

    #[error("Invalid value for \"{name}.{key}\": {reason}")]
    InvalidEnumValue {
        name:   String,
        key:    String,
        reason: String,
    },

    #[error("file_identifier \"{value}\" must be exactly 4 bytes, found {length}")]
    InvalidFileIdentifierLength { value: String, length: usize },

    #[error("Recursive nesting of \"{name}\" is not allowed")]
    RecursiveStruct { name: String },

    #[error("root_type \"{name}\" must be a table")]
    InvalidRootType { name: String },

    #[error("Circular includes detected: \"{}\" includes \"{}\"", .includer.display(), .included.display())]
    CircularInclude {
        includer: PathBuf,
        included: PathBuf,
    },

    #[error("Unsupported generator \"{0}\" (available: json)")]
    UnsupportedGenerator(String),

    #[error("Compilation cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{}: {source}", .path.display())]
    InFile {
        path:   PathBuf,
        source: Box<FbsError>,
    },
}

impl FbsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FbsError::Io { path: path.into(), source }
    }

    /// Attaches the path of the file being compiled. Errors raised inside an
    /// included file keep the innermost path.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            FbsError::InFile { .. } | FbsError::Cancelled => self,
            other => FbsError::InFile {
                path:   path.into(),
                source: Box::new(other),
            },
        }
    }

    /// The error with any `InFile` wrapper removed.
    pub fn root_cause(&self) -> &FbsError {
        match self {
            FbsError::InFile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
