use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Referential(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[cfg(feature = "xlsx")]
    #[error("Spreadsheet error: {0}")]
    Xlsx(String),

    #[cfg(feature = "pdf")]
    #[error("PDF error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
