//! Message envelope exchanged with the proxy.

use super::{names, MessageKind, MessageType, Properties};
use crate::error::{CoreError, CoreResult};
use crate::types::ProxyError;

/// One framed message: type code, correlation id and property payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyMessage {
    pub message_type: MessageType,
    /// Correlation id. Zero for events.
    pub request_id: u64,
    pub properties: Properties,
}

impl ProxyMessage {
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            request_id: 0,
            properties: Properties::new(),
        }
    }

    /// Build the reply for an inbound request, carrying its request id.
    pub fn reply_to(request: &ProxyMessage) -> CoreResult<Self> {
        let reply_type = request
            .message_type
            .reply_type()
            .ok_or_else(|| CoreError::MalformedFrame(format!(
                "{} does not expect a reply",
                request.message_type
            )))?;
        Ok(Self {
            message_type: reply_type,
            request_id: request.request_id,
            properties: Properties::new(),
        })
    }

    pub fn kind(&self) -> MessageKind {
        self.message_type.kind()
    }

    pub fn with_string(mut self, name: &str, value: impl Into<String>) -> Self {
        self.properties.set_string(name, value);
        self
    }

    pub fn with_i64(mut self, name: &str, value: i64) -> Self {
        self.properties.set_i64(name, value);
        self
    }

    pub fn with_bool(mut self, name: &str, value: bool) -> Self {
        self.properties.set_bool(name, value);
        self
    }

    pub fn with_bytes(mut self, name: &str, value: Option<&[u8]>) -> Self {
        self.properties.set_bytes(name, value);
        self
    }

    /// Attach an error to a reply.
    pub fn set_error(&mut self, error: &ProxyError) -> CoreResult<()> {
        self.properties.set_json(names::ERROR, error)
    }

    pub fn with_error(mut self, error: &ProxyError) -> CoreResult<Self> {
        self.set_error(error)?;
        Ok(self)
    }

    /// The error carried by a reply, if any.
    pub fn error(&self) -> CoreResult<Option<ProxyError>> {
        self.properties.get_json(names::ERROR)
    }
}
