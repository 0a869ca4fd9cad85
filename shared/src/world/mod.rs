pub mod entity;
pub mod entity_registry;
pub mod error;
pub mod network_id_pool;
pub mod prefab_registry;
pub mod remote;
