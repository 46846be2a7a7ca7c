use serde::{Deserialize, Serialize};

use crate::{ErrorShape, PublicIdentity};

// ── Inbound ──────────────────────────────────────────────────────────────────

/// A frame sent by a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Bind this socket to an existing identity.
    #[serde(rename = "session.login")]
    Login { id: u64, secret: String },
    /// Join the admin-only stream. Requires a privileged identity.
    #[serde(rename = "session.adminLogin")]
    AdminLogin { id: u64, secret: String },
    #[serde(rename = "session.areWeOp")]
    AreWeOp,
    #[serde(rename = "event.join")]
    JoinEvent { event_unique: String },
    #[serde(rename = "event.leave")]
    LeaveEvent { event_unique: String },
    #[serde(rename = "event.create")]
    CreateEvent { title: String, capacity: i64 },
    #[serde(rename = "pm.send")]
    SendMessage { to: u64, message: String },
    #[serde(rename = "request.resolve")]
    ResolveRequest { unique: String, accepted: bool },
    #[serde(rename = "box.remove")]
    RemoveBox { unique: String },
    #[serde(rename = "session.setPrivileged")]
    SetPrivileged { id: u64, privileged: bool },
    #[serde(rename = "pm.setEnabled")]
    SetPrivateMessaging { enabled: bool },
}

impl ClientFrame {
    /// Wire name of the frame, used for authorization and logging.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Login { .. } => "session.login",
            Self::AdminLogin { .. } => "session.adminLogin",
            Self::AreWeOp => "session.areWeOp",
            Self::JoinEvent { .. } => "event.join",
            Self::LeaveEvent { .. } => "event.leave",
            Self::CreateEvent { .. } => "event.create",
            Self::SendMessage { .. } => "pm.send",
            Self::ResolveRequest { .. } => "request.resolve",
            Self::RemoveBox { .. } => "box.remove",
            Self::SetPrivileged { .. } => "session.setPrivileged",
            Self::SetPrivateMessaging { .. } => "pm.setEnabled",
        }
    }
}

// ── Outbound ─────────────────────────────────────────────────────────────────

/// A frame pushed by the gateway. Box payloads are full snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ServerFrame {
    #[serde(rename = "box.created")]
    BoxCreated(serde_json::Value),
    #[serde(rename = "box.updated")]
    BoxUpdated(serde_json::Value),
    /// Entire box collection of a stream, sent on (re)join.
    #[serde(rename = "stream.snapshot")]
    StreamSnapshot(Vec<serde_json::Value>),
    #[serde(rename = "roster.updated")]
    RosterUpdated(Vec<PublicIdentity>),
    #[serde(rename = "request.accepted")]
    RequestAccepted(String),
    #[serde(rename = "request.denied")]
    RequestDenied(String),
    #[serde(rename = "auth.failed")]
    AuthFailed { reason: String },
    #[serde(rename = "error")]
    Error(ErrorShape),
    #[serde(rename = "session.op")]
    SessionOp(bool),
    #[serde(rename = "pm.message")]
    PrivateMessage {
        from: PublicIdentity,
        message: String,
    },
}

impl ServerFrame {
    pub fn event(&self) -> &'static str {
        match self {
            Self::BoxCreated(_) => "box.created",
            Self::BoxUpdated(_) => "box.updated",
            Self::StreamSnapshot(_) => "stream.snapshot",
            Self::RosterUpdated(_) => "roster.updated",
            Self::RequestAccepted(_) => "request.accepted",
            Self::RequestDenied(_) => "request.denied",
            Self::AuthFailed { .. } => "auth.failed",
            Self::Error(_) => "error",
            Self::SessionOp(_) => "session.op",
            Self::PrivateMessage { .. } => "pm.message",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
