pub mod analysis;
pub mod documents;
pub mod entities;
pub mod graph;
pub mod health;
pub mod session;
