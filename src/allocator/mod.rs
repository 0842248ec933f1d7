mod replica_set_allocator;
pub use replica_set_allocator::*;
