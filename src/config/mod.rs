pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{ConfigOverrides, ReplayConfig};
