mod exclusion_coordinator;
pub use exclusion_coordinator::*;
