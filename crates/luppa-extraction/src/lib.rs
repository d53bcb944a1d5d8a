pub mod pipeline;
pub mod rules;

pub use pipeline::LlmExtractor;
pub use rules::RuleBasedExtractor;
