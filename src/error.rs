//! Error types shared by the driver seams and the proxies.

use thiserror::Error;

/// Boxed error produced by a concrete driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for driver operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by drivers, proxies and the registry.
#[derive(Error, Debug)]
pub enum Error {
    /// The connection or driver does not implement the requested capability.
    ///
    /// Callers treat this as "fall back to the next mechanism", never as a
    /// query failure.
    #[error("driver: capability not supported, fall back")]
    Skip,

    /// No driver is registered under the requested name.
    #[error("sql: unknown driver {0:?} (forgotten registration?)")]
    UnknownDriver(String),

    /// A driver was registered twice under the same name.
    #[error("sql: register called twice for driver {0:?}")]
    DuplicateDriver(String),

    /// The physical connection is no longer usable.
    #[error("driver: bad connection")]
    BadConn,

    /// Error reported by the wrapped driver.
    #[error(transparent)]
    Driver(BoxError),
}

impl Error {
    /// Wrap an error coming from a concrete driver.
    pub fn driver(err: impl Into<BoxError>) -> Self {
        Error::Driver(err.into())
    }

    /// Whether this is the unsupported-capability signal.
    pub fn is_skip(&self) -> bool {
        matches!(self, Error::Skip)
    }
}
