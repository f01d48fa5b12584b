use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("Response not received from PPMS ({action}): {reason}")]
    Connectivity { action: &'static str, reason: String },

    #[error("Invalid value \"{value}\" in column \"{column}\"")]
    Parse { column: String, value: String },

    #[error("Malformed PPMS response: {0}")]
    Response(String),

    #[error("Unknown placeholder {{{name}}} in message text")]
    Format { name: String },

    #[error("Unbalanced brace at position {position} in message text")]
    Brace { position: usize },

    #[error("Problem sending email: {0}")]
    Send(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid invoice reference \"{input}\" (expected a YYYYMMDD date at offset {offset})")]
    InvalidReference { input: String, offset: usize },

    #[error("Account code {0} is not part of this invoice")]
    UnknownAccount(String),

    /// Failure reported back from a worker thread
    #[error("{0}")]
    Task(String),
}

impl AppError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<tera::Error> for AppError {
    fn from(e: tera::Error) -> Self {
        // tera nests the useful part of the message in the source chain
        let mut text = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(inner) = source {
            text.push_str(": ");
            text.push_str(&inner.to_string());
            source = inner.source();
        }
        AppError::Template(text)
    }
}

pub(crate) type Result<T> = std::result::Result<T, AppError>;
