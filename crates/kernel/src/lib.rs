//! Configuration binding and the explicit application context.

pub mod context;
pub mod settings;

pub use context::AppContext;
pub use settings::{ApplicationProperties, Environment};
