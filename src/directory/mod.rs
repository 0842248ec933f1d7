mod registry;
mod replica_directory;
pub use registry::*;
pub use replica_directory::*;

#[cfg(test)]
mod replica_directory_test;
