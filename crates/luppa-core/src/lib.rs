pub mod api_types;
pub mod config;
pub mod entity;
pub mod error;
pub mod extraction;
pub mod pattern;

pub use config::{AnalysisConfig, AppConfig};
pub use entity::{Edge, EdgeKey, Entity, EntityType, Mention, RelationMention, RelationType};
pub use error::{LuppaError, Result};
pub use extraction::{DocumentType, Extractor, RawDocument};
pub use pattern::{AnalysisReport, PatternInstance, PatternRef, PatternType, RiskScore};
