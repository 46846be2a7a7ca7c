//! Content units of a stream.
//!
//! Box kinds are a closed set. Each box carries a stream-unique id and the
//! visibility flags the dispatcher uses to pick recipients.

mod event;
mod request;
mod text;

use {
    lansite_protocol::PublicIdentity,
    serde::Serialize,
    tracing::warn,
    uuid::Uuid,
};

use crate::error::StreamError;

pub use {
    event::{EventBox, MembershipChange},
    request::RequestBox,
    text::TextBox,
};

/// Client-originated events addressed to a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxEvent {
    Join,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BoxKind {
    Text(TextBox),
    Request(RequestBox),
    Event(EventBox),
}

impl BoxKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Request(_) => "request",
            Self::Event(_) => "event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamBox {
    pub unique: String,
    /// Only privileged identities receive this box or may act on it.
    pub admin_only: bool,
    /// Lives on the admin stream only.
    pub admin_stream_only: bool,
    #[serde(flatten)]
    pub kind: BoxKind,
}

/// Fresh stream-unique box id.
pub fn new_unique() -> String {
    Uuid::new_v4().simple().to_string()
}

impl StreamBox {
    fn with_kind(kind: BoxKind) -> Self {
        Self {
            unique: new_unique(),
            admin_only: false,
            admin_stream_only: false,
            kind,
        }
    }

    pub fn text(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_kind(BoxKind::Text(TextBox::new(title, text)))
    }

    pub fn event(event: EventBox) -> Self {
        Self::with_kind(BoxKind::Event(event))
    }

    pub fn request(request: RequestBox) -> Self {
        Self {
            admin_only: true,
            admin_stream_only: true,
            ..Self::with_kind(BoxKind::Request(request))
        }
    }

    pub fn as_event(&self) -> Option<&EventBox> {
        match &self.kind {
            BoxKind::Event(event) => Some(event),
            _ => None,
        }
    }

    /// Apply a client event. Only event boxes accept join/leave.
    pub fn on_event(
        &mut self,
        event: BoxEvent,
        actor: &PublicIdentity,
    ) -> Result<MembershipChange, StreamError> {
        match &mut self.kind {
            BoxKind::Event(target) => Ok(match event {
                BoxEvent::Join => target.join(actor),
                BoxEvent::Leave => target.leave(actor.id),
            }),
            other => Err(StreamError::NotFound(format!(
                "{} box {} has no {event:?} handler",
                other.name(),
                self.unique
            ))),
        }
    }

    /// Full client-facing representation of the box.
    pub fn to_snapshot(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self)
            .inspect_err(|e| warn!(unique = %self.unique, error = %e, "box snapshot failed"))
            .ok()
    }
}
