use thiserror::Error;

use crate::entity::EntityType;

#[derive(Error, Debug)]
pub enum LuppaError {
    #[error("ambiguous entity '{name}': registered as {existing:?}, mentioned as {incoming:?}")]
    AmbiguousEntity {
        name: String,
        existing: EntityType,
        incoming: EntityType,
    },

    #[error("malformed relation: {0}")]
    MalformedRelation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LuppaError>;
