use crate::{protocol::ProtocolError, rpc::rpc_handler::RpcHandler, types::RpcCode};

/// Session RPC handlers, each claiming a distinct code.
#[derive(Default)]
pub struct RpcTable {
    handlers: Vec<Box<dyn RpcHandler>>,
}

impl RpcTable {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add(&mut self, handler: Box<dyn RpcHandler>) -> Result<(), ProtocolError> {
        let code = handler.rpc_code();
        if self.get(code).is_some() {
            return Err(ProtocolError::DuplicateRpcCode { code });
        }
        self.handlers.push(handler);
        Ok(())
    }

    /// First handler claiming `code`.
    pub fn get(&self, code: RpcCode) -> Option<&dyn RpcHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.rpc_code() == code)
            .map(|handler| handler.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
