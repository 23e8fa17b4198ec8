//! Error type shared by the list algebra and the namespace bridge.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdListError {
    /// The allocator could not satisfy a request.
    #[error("allocator could not provide {requested} bytes")]
    OutOfMemory { requested: usize },

    /// A path segment could not be resolved by the provider.
    #[error("segment `{segment}` of path `{path}` was not found")]
    PathNotFound { segment: String, path: String },

    /// Any other provider failure (binding, enumeration, object retrieval).
    #[error("namespace provider failed: {message}")]
    Provider { message: String },

    /// Raw bytes do not form a valid identifier list.
    #[error("malformed identifier list at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    /// An item token does not fit in a single record.
    #[error("item token of {len} bytes does not fit in a record")]
    ItemTooLarge { len: usize },

    /// The ancestor walk did not reach the root within the configured bound.
    #[error("ancestor walk exceeded the depth limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error("the shared allocator is already initialized")]
    AlreadyInitialized,
}

impl IdListError {
    /// Shorthand for providers reporting a failure.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}

pub type Result<T, E = IdListError> = std::result::Result<T, E>;
