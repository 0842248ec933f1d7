//! Caller-facing pool operations.
//!
//! [`PoolService`] wires the allocator, directory registry, locator,
//! connection manager and exclusion coordinator together behind the
//! create/connect/disconnect/destroy/exclude/query surface. It is assembled
//! by [`PoolServiceBuilder`].

mod builder;
mod pool_service;
mod provisioner;
mod request;
pub use builder::*;
pub use pool_service::*;
pub use provisioner::*;
pub use request::*;
