use crate::core::models::space::SpaceError;
use crate::engine::config::ConfigError;
use crate::engine::moves::MoveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Move failed: {source}")]
    Move {
        #[from]
        source: MoveError,
    },

    #[error("Space error: {source}")]
    Space {
        #[from]
        source: SpaceError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
