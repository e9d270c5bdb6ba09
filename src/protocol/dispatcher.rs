use crate::core::section::Section;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::command::Command;
use crate::protocol::message::support_flags_response;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

type HandlerFn = dyn Fn(&Section) -> Result<Section> + Send + Sync + 'static;

/// Routes inbound requests to a handler by command.
///
/// Cloning shares the handler table.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<Command, Box<HandlerFn>>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Dispatcher that answers support-flags requests
    pub fn with_defaults() -> Result<Self> {
        let dispatcher = Self::new();
        dispatcher.register(Command::RequestSupportFlags, |_| Ok(support_flags_response()))?;
        Ok(dispatcher)
    }

    /// Install `handler` for `command`, replacing any previous one
    pub fn register<F>(&self, command: Command, handler: F) -> Result<()>
    where
        F: Fn(&Section) -> Result<Section> + Send + Sync + 'static,
    {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string()))?;

        handlers.insert(command, Box::new(handler));
        Ok(())
    }

    pub fn handles(&self, command: Command) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(&command))
            .unwrap_or(false)
    }

    pub fn dispatch(&self, command: Command, request: &Section) -> Result<Section> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string()))?;

        debug!(command = command.name(), "dispatching request");
        handlers
            .get(&command)
            .ok_or_else(|| ProtocolError::UnexpectedMessage(format!("no handler for {command}")))
            .and_then(|handler| handler(request))
    }
}
