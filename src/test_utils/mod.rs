//! Helpers shared by the unit tests
mod common;

pub use common::*;
