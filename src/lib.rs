pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod pump;
pub mod queue;
pub mod replay;
pub mod requester;
pub mod shutdown;
pub mod worker;

pub use config::{ConfigLoader, ConfigOverrides, ReplayConfig};
pub use error::{Error, Result};
pub use metrics::snapshot::ReplaySnapshot;
pub use replay::ReplayEngine;
pub use requester::{HttpRequester, Requester};
pub use shutdown::Shutdown;
