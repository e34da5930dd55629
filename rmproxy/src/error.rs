//! Error types for the proxy layer.

use broadlink_client::ClientError;
use thiserror::Error;

/// Errors raised while loading configuration or serving requests.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error decoding {stream} JSON: {source}")]
    Json {
        stream: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("command {0:?} should not contain a space")]
    CommandWithSpace(String),

    #[error("room {0:?} does not exist")]
    UnknownRoom(String),

    #[error("command {command:?} not found in room {room:?}")]
    CommandNotInRoom { room: String, command: String },

    #[error("{0:?} is an invalid instruction")]
    InvalidInstruction(String),

    #[error("pause interval {0:?} is not a valid number")]
    InvalidPauseInterval(String),

    #[error("{0:?} is not a valid macro")]
    UnknownMacro(String),

    #[error("{0:?} is not a Home Assistant command")]
    UnknownBridgeCommand(String),

    #[error("Home Assistant server is not defined")]
    BridgeServerMissing,

    #[error("Home Assistant password is not defined")]
    BridgePasswordMissing,

    #[error("error making request to Home Assistant server: {0}")]
    Bridge(String),

    /// The dispatcher worker is gone; nothing can be enqueued or answered.
    #[error("the command dispatcher is not running")]
    DispatcherGone,

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ProxyError {
    pub(crate) fn json(stream: &'static str, source: serde_json::Error) -> Self {
        Self::Json { stream, source }
    }
}

/// Convenience Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;
