pub mod reporter;
pub mod snapshot;
pub mod ticker;

pub use reporter::{RateReporter, RateSample, ReplayEvent};
pub use snapshot::ReplaySnapshot;
pub use ticker::Tick;
