mod dispatcher;
mod error;
mod events;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use events::{
    DespawnEntityEvent, EntityRpcEvent, ErrorEvent, Event, Events, PeerCloseEvent,
    PeerHandshakeEvent, RpcEvent, SpawnEntityEvent, UpdateEntityEvent,
};
