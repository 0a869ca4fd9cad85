use std::{
    cell::RefCell,
    ops::{Deref, DerefMut},
    rc::Rc,
    time::Instant,
};

use peerlink_shared::{Dispatcher, DispatcherConfig, Events, PeerId};

use crate::{
    loopback_transport::LoopbackHub,
    test_protocol::{protocol, RpcLog, RpcRecord},
};

/// A dispatcher wired to a loopback hub, with its own session RPC log
pub struct TestPeer {
    id: PeerId,
    dispatcher: Dispatcher,
    rpc_log: RpcLog,
}

impl TestPeer {
    pub fn new(hub: &LoopbackHub, id: PeerId) -> Self {
        Self::with_config(hub, id, DispatcherConfig::default())
    }

    pub fn with_config(hub: &LoopbackHub, id: PeerId, config: DispatcherConfig) -> Self {
        let rpc_log: RpcLog = Rc::new(RefCell::new(Vec::new()));
        let dispatcher = Dispatcher::new(config, protocol(&rpc_log), hub.transport(id));
        Self {
            id,
            dispatcher,
            rpc_log,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn rpc_records(&self) -> Vec<RpcRecord> {
        self.rpc_log.borrow().clone()
    }

    pub fn tick(&mut self, now: &Instant) -> Events {
        self.dispatcher.tick(now)
    }
}

impl Deref for TestPeer {
    type Target = Dispatcher;

    fn deref(&self) -> &Self::Target {
        &self.dispatcher
    }
}

impl DerefMut for TestPeer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dispatcher
    }
}
