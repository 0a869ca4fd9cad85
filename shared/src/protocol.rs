use crate::{
    rpc::{rpc_handler::RpcHandler, rpc_table::RpcTable},
    types::PrefabId,
    world::{entity::replicate::Replicate, prefab_registry::PrefabRegistry},
};

pub mod error;
pub use error::ProtocolError;

/// Everything peers must agree on before a session starts: entity templates
/// and session RPC handlers. Built once at startup, then locked.
#[derive(Default)]
pub struct Protocol {
    pub prefabs: PrefabRegistry,
    pub rpc_handlers: RpcTable,
    locked: bool,
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn add_prefab<R: Replicate, F: Fn() -> R + 'static>(
        &mut self,
        prefab_id: PrefabId,
        factory: F,
    ) -> &mut Self {
        self.check_lock();
        if let Err(err) = self.prefabs.add::<R, F>(prefab_id, factory) {
            panic!("{}", err);
        }
        self
    }

    pub fn add_rpc_handler<H: RpcHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.check_lock();
        if let Err(err) = self.rpc_handlers.add(Box::new(handler)) {
            panic!("{}", err);
        }
        self
    }

    // Non-panicking builder methods

    pub fn try_add_prefab<R: Replicate, F: Fn() -> R + 'static>(
        &mut self,
        prefab_id: PrefabId,
        factory: F,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.prefabs.add::<R, F>(prefab_id, factory)?;
        Ok(self)
    }

    pub fn try_add_rpc_handler<H: RpcHandler + 'static>(
        &mut self,
        handler: H,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.rpc_handlers.add(Box::new(handler))?;
        Ok(self)
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if protocol is locked without panicking
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if protocol is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }
}
