pub mod dirty_bits;
pub mod error;
pub mod network_entity;
pub mod replicate;
