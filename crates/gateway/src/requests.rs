//! Pending requests that wait for an admin decision.
//!
//! A request is a tagged action plus the requestor's id. Each one is
//! rendered as a [`RequestBox`] on the admin stream, which is owned here and
//! only reachable through the main stream.

use {
    lansite_protocol::PublicIdentity,
    tracing::{debug, info},
};

use crate::{
    boxes::{RequestBox, StreamBox},
    dispatcher::Dispatcher,
    stream::{Stream, StreamPolicy},
};

const ADMIN_WELCOME_TITLE: &str = "Admin stream";
const ADMIN_WELCOME_TEXT: &str = "Requests from users show up here. Accept or deny them below.";

/// What happens when a request is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    CreateEvent { title: String, capacity: i64 },
}

impl PendingAction {
    /// Human-readable tail of the notification text.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateEvent { title, .. } => format!("wants to create an event: {title}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accepted,
    Denied,
    /// Replaced by a newer request from the same requestor.
    Superseded,
}

/// Result of submitting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The action ran immediately without gating.
    Executed,
    /// The requestor is privileged; the action ran and nobody was notified.
    Bypassed,
    Opened {
        unique: String,
        superseded: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub unique: String,
    pub requestor: PublicIdentity,
    pub description: String,
    pub action: PendingAction,
}

impl PendingRequest {
    /// Text sent to the requestor on resolution.
    pub fn notice(&self) -> String {
        format!("{} {}", self.requestor.display_name, self.description)
    }
}

#[derive(Debug)]
pub struct RequestManager {
    admin_stream: Stream,
    pending: Vec<PendingRequest>,
}

impl RequestManager {
    pub fn new(policy: StreamPolicy) -> Self {
        let mut admin_stream = Stream::basic(policy);
        admin_stream.add_box(StreamBox::text(ADMIN_WELCOME_TITLE, ADMIN_WELCOME_TEXT));
        Self {
            admin_stream,
            pending: Vec::new(),
        }
    }

    pub fn admin_stream(&self) -> &Stream {
        &self.admin_stream
    }

    pub fn admin_stream_mut(&mut self) -> &mut Stream {
        &mut self.admin_stream
    }

    pub fn pending(&self) -> &[PendingRequest] {
        &self.pending
    }

    /// Register a request and show it to every connected admin.
    pub(crate) fn open(
        &mut self,
        requestor: PublicIdentity,
        description: String,
        action: PendingAction,
    ) -> String {
        let request_box = StreamBox::request(RequestBox::new(requestor.clone(), &description));
        let unique = request_box.unique.clone();
        info!(
            unique,
            requestor = requestor.id,
            description,
            "request opened"
        );
        self.pending.push(PendingRequest {
            unique: unique.clone(),
            requestor,
            description,
            action,
        });
        self.admin_stream.create_and_broadcast(request_box);
        unique
    }

    pub(crate) fn take(&mut self, unique: &str) -> Option<PendingRequest> {
        let idx = self.pending.iter().position(|r| r.unique == unique)?;
        Some(self.pending.remove(idx))
    }

    pub(crate) fn take_open_for(&mut self, requestor_id: u64) -> Option<PendingRequest> {
        let idx = self
            .pending
            .iter()
            .position(|r| r.requestor.id == requestor_id)?;
        Some(self.pending.remove(idx))
    }

    /// Drop the request's box from the admin stream and resync every admin.
    pub(crate) fn retire(&mut self, unique: &str) {
        if self.admin_stream.remove(unique) {
            let delivered = Dispatcher::send_stream_to_all(
                self.admin_stream.boxes(),
                self.admin_stream.sessions(),
            );
            debug!(unique, delivered, "request retired");
        }
    }
}
