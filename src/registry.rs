//! Dispatch table of message handlers, keyed by global message number.

use alloc::{collections::BTreeMap, vec::Vec};

use crate::{
    avec::Profile,
    error::Error,
    message::Message,
    profile,
    sans::{DataError, EncodeError, definition::Definition},
};

/// Decode a data record's standard fields laid out by a definition.
pub type DecodeFn = fn(u16, &[u8], &Definition) -> Result<Message, DataError>;

/// Encode a definition and data record for a message at a local number.
pub type EncodeFn = fn(&Message, u8, &mut Vec<u8>) -> Result<(), EncodeError>;

/// Decode and encode operations for one kind of message.
#[derive(Debug, Clone, Copy)]
pub struct Handler {
    /// Global message number.
    pub number: u16,
    pub name: &'static str,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

impl Handler {
    /// A handler using the generic field codec.
    pub const fn new(number: u16, name: &'static str) -> Self {
        Self {
            number,
            name,
            decode: Message::decode,
            encode: Message::encode,
        }
    }
}

/// The set of messages a decoder publishes.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    handlers: BTreeMap<u16, Handler>,
}

impl Registry {
    /// An empty registry. A decoder using it publishes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting handlers sharing a message number.
    pub fn from_handlers(handlers: &[Handler]) -> Result<Self, Error> {
        let mut registry = Self::new();
        for handler in handlers {
            registry.register(*handler)?;
        }
        Ok(registry)
    }

    /// A registry of every message in [`crate::profile`].
    pub fn profile() -> Self {
        let mut registry = Self::new();
        for handler in profile::HANDLERS {
            registry.handlers.insert(handler.number, *handler);
        }
        registry
    }

    /// Add a handler, rejecting it if its message number is taken.
    pub fn register(&mut self, handler: Handler) -> Result<(), Error> {
        if self.handlers.contains_key(&handler.number) {
            Err(Error::DuplicateMessageHandler(handler.number))?;
        }
        self.handlers.insert(handler.number, handler);
        Ok(())
    }

    /// Add the handler of a [`Profile`].
    pub fn with<P: Profile>(mut self) -> Result<Self, Error> {
        self.register(P::HANDLER)?;
        Ok(self)
    }

    pub fn get(&self, number: u16) -> Option<&Handler> {
        self.handlers.get(&number)
    }

    pub fn contains(&self, number: u16) -> bool {
        self.handlers.contains_key(&number)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
