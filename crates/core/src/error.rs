use thiserror::Error;

/// Coarse classification of an [`EngineError`], mirrored in boundary
/// responses so callers can distinguish bad input from bad timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Content could not be interpreted as the declared format.
    Parse,
    /// The request itself was malformed.
    Validation,
    /// The operation was issued before any successful load.
    State,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("csv error on row {row}: {source}")]
    CsvRow { row: usize, source: csv::Error },
    #[error("the content appears to be HTML, not JSON")]
    MarkupNotJson,
    #[error("no array found under selector '{0}'")]
    SelectorNotFound(String),
    #[error("top-level JSON value is not an array; supply a selector")]
    TopLevelNotArray,
    #[error("no content provided")]
    EmptyContent,
    #[error("a selector is required for {0} content")]
    SelectorRequired(&'static str),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("unknown filter condition: {0}")]
    UnknownCondition(String),
    #[error("no data loaded")]
    NoData,
    #[error("engine worker stopped")]
    WorkerStopped,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Json(_)
            | EngineError::Xml(_)
            | EngineError::CsvRow { .. }
            | EngineError::MarkupNotJson
            | EngineError::SelectorNotFound(_)
            | EngineError::TopLevelNotArray => ErrorKind::Parse,
            EngineError::EmptyContent
            | EngineError::SelectorRequired(_)
            | EngineError::UnsupportedFormat(_)
            | EngineError::UnknownCondition(_) => ErrorKind::Validation,
            EngineError::NoData | EngineError::WorkerStopped => ErrorKind::State,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
