//! Client-side pool sessions.
//!
//! - [`AccessFlags`] - pool connect modes
//! - [`Session`] - handle binding a pool to its believed leader
//! - [`SessionRegistry`] - outstanding sessions, used by exclusion and destroy
//! - [`ConnectionManager`] - connect, disconnect and lazy failover
//!
//! Session lifecycle:
//! `Unconnected -> Connected -> Degraded -> Connected -> Unconnected`, with
//! `Degraded -> Failed` when re-resolution exhausts every replica.

mod access_flags;
mod connection_manager;
mod session;
mod session_registry;
pub use access_flags::*;
pub use connection_manager::*;
pub use session::*;
pub use session_registry::*;
