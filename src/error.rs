
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowfoldError {
    #[error("Not query data: {0}")]
    QueryData(String),
    #[error("Missing template keys {0:?}")]
    MissingTemplateKeys(Vec<String>),
    #[error("Must have values for {0} template")]
    EmptyValues(String),
    #[error("Parameter name collision: {0}")]
    ParameterCollision(String),
    #[error("Coercion error for {column}: {message}")]
    Coercion { column: String, message: String },
    #[error("Driver error: {0}")]
    Driver(String),
}

pub type Result<T> = std::result::Result<T, RowfoldError>;

// Helper conversions
impl From<rusqlite::Error> for RowfoldError {
    fn from(e: rusqlite::Error) -> Self { Self::Driver(e.to_string()) }
}
