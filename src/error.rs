use thiserror::Error;

/// Library error type.
///
/// `Clone` is required because a failed aggregation is handed to every caller
/// sharing the in-flight future; reqwest/serde causes are therefore flattened
/// to messages at the boundary instead of being carried as sources.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("http request failed: {0}")]
    Http(String),

    /// Upstream answered 2xx but with an error payload or an unexpected shape.
    #[error("upstream api error: {0}")]
    Api(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("cache store error: {0}")]
    Storage(String),

    /// A per-country supplement fetch failed; the pipeline reports which one.
    #[error("supplement fetch for {cca2} failed: {source}")]
    Supplement {
        cca2: String,
        #[source]
        source: Box<Error>,
    },

    /// Sorting was requested on a field that does not resolve to comparable
    /// strings or numbers for every record.
    #[error("unsupported sort key: {0}")]
    UnsupportedSortKey(String),
}

impl Error {
    pub fn for_country(self, cca2: &str) -> Self {
        Error::Supplement {
            cca2: cca2.to_string(),
            source: Box::new(self),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
