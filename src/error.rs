use core::fmt;

/// Result alias for `hclust`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the collaborators around the clustering engine.
///
/// The engine itself has no failure mode: an empty candidate set or a
/// checker veto simply ends the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A linkage name did not match any built-in method.
    UnknownLinkage(String),

    /// A distance map contained a NaN or infinite distance.
    NonFiniteDistance {
        /// Left item (debug-formatted).
        from: String,
        /// Right item (debug-formatted).
        to: String,
        /// The offending value.
        distance: f64,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownLinkage(name) => write!(
                f,
                "unknown linkage '{name}': expected single, complete, average or weighted"
            ),
            Error::NonFiniteDistance { from, to, distance } => {
                write!(f, "non-finite distance {distance} between {from} and {to}")
            }
        }
    }
}

impl std::error::Error for Error {}
