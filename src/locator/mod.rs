mod leader_locator;
mod negative_cache;
pub use leader_locator::*;
pub(crate) use negative_cache::*;
