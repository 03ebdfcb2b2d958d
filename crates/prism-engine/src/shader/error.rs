use std::path::PathBuf;

/// Why a shader could not be produced.
///
/// `Clone` so every caller waiting on the same compile can receive it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader source {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("{}:{line}: {message}", .path.display())]
    Include {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("shader `{name}` failed to parse:\n{message}")]
    Parse { name: String, message: String },

    #[error("shader `{name}` failed validation:\n{message}")]
    Validation { name: String, message: String },

    #[error("shader `{name}` has no entry point `{entry}`")]
    MissingEntryPoint { name: String, entry: String },
}

impl ShaderError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        ShaderError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
