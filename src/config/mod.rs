/// Database connection and table creation
pub mod database;

/// Desk settings loaded from config.toml
pub mod desk;

pub use desk::{BreachNotify, DeadlineBasis, DeskConfig, OrderApiConfig, SlaConfig};
