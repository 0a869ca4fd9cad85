pub mod helpers;

pub use helpers::*;
pub use loopback_transport::{LoopbackHub, LoopbackTransport, SentPacket};
pub use test_protocol::{
    protocol, AnimationController, Armor, ChatHandler, Plant, PlantRpc, RpcLog, RpcRecord,
    StartGameHandler, TargetHandler, Zombie, ZombieRpc, CHAT_RPC, PLANT_PREFAB, START_GAME_RPC,
    TARGET_RPC, ZOMBIE_PREFAB,
};
