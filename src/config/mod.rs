//! Tool configuration (`stylebuild.toml`) loading and schema.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
