use thiserror::Error;

use crate::model::Location;

/// Failure of a single locator resolution attempt.
///
/// These never abort a batch: the caller drops the one leaf that needed the
/// value and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unsupported expression shape '{shape}' at {location}: {snippet}")]
    UnsupportedExpressionShape {
        shape: String,
        snippet: String,
        location: Location,
    },

    #[error("identifier '{name}' has no declaration in scope at {location}")]
    UnboundIdentifier { name: String, location: Location },

    #[error("cannot locate declaration of '{callee}' called at {location}")]
    CalleeNotFound { callee: String, location: Location },

    #[error("resolution exceeded depth {max_depth} at {location}")]
    DepthExceeded { max_depth: usize, location: Location },

    #[error("binding of '{name}' refers back to itself at {location}")]
    CyclicBinding { name: String, location: Location },
}

impl ResolveError {
    pub fn unsupported(
        shape: impl Into<String>,
        snippet: impl Into<String>,
        location: Location,
    ) -> Self {
        Self::UnsupportedExpressionShape {
            shape: shape.into(),
            snippet: snippet.into(),
            location,
        }
    }

    pub fn unbound(name: impl Into<String>, location: Location) -> Self {
        Self::UnboundIdentifier {
            name: name.into(),
            location,
        }
    }

    pub fn callee_not_found(callee: impl Into<String>, location: Location) -> Self {
        Self::CalleeNotFound {
            callee: callee.into(),
            location,
        }
    }

    pub fn cyclic(name: impl Into<String>, location: Location) -> Self {
        Self::CyclicBinding {
            name: name.into(),
            location,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Self::UnsupportedExpressionShape { location, .. }
            | Self::UnboundIdentifier { location, .. }
            | Self::CalleeNotFound { location, .. }
            | Self::DepthExceeded { location, .. }
            | Self::CyclicBinding { location, .. } => location,
        }
    }
}
