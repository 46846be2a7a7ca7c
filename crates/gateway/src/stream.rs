//! A stream: an ordered box collection plus the identities subscribed to it.
//!
//! All mutation happens through `&mut Stream`, so callers serialize access
//! with one lock per stream and every check-then-act sequence below (capacity
//! checks, request resolution) is atomic.

use {
    lansite_protocol::ServerFrame,
    lansite_sessions::SessionRegistry,
    tracing::{debug, info, warn},
};

use crate::{
    boxes::{BoxEvent, EventBox, MembershipChange, StreamBox},
    dispatcher::Dispatcher,
    error::StreamError,
    requests::{PendingAction, PendingRequest, RequestManager, Resolution, Submission},
};

/// Switches that change how a stream treats its participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPolicy {
    /// Non-privileged event creation goes through admin approval.
    pub gate_event_creation: bool,
    /// Only privileged identities may create events at all.
    pub events_admin_only: bool,
    pub private_messaging: bool,
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self {
            gate_event_creation: true,
            events_admin_only: false,
            private_messaging: true,
        }
    }
}

#[derive(Debug)]
pub struct Stream {
    boxes: Vec<StreamBox>,
    sessions: SessionRegistry,
    requests: Option<Box<RequestManager>>,
    policy: StreamPolicy,
}

impl Stream {
    /// A stream without a request workflow.
    pub fn basic(policy: StreamPolicy) -> Self {
        Self {
            boxes: Vec::new(),
            sessions: SessionRegistry::new(policy.private_messaging),
            requests: None,
            policy,
        }
    }

    /// A stream that owns a request manager and its admin stream.
    pub fn with_requests(policy: StreamPolicy) -> Self {
        Self {
            requests: Some(Box::new(RequestManager::new(policy))),
            ..Self::basic(policy)
        }
    }

    pub fn policy(&self) -> &StreamPolicy {
        &self.policy
    }

    pub fn boxes(&self) -> &[StreamBox] {
        &self.boxes
    }

    pub fn find_box(&self, unique: &str) -> Option<&StreamBox> {
        self.boxes.iter().find(|b| b.unique == unique)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut SessionRegistry {
        &mut self.sessions
    }

    pub fn requests(&self) -> Option<&RequestManager> {
        self.requests.as_deref()
    }

    pub fn admin_stream(&self) -> Option<&Stream> {
        self.requests.as_deref().map(RequestManager::admin_stream)
    }

    pub fn admin_stream_mut(&mut self) -> Option<&mut Stream> {
        self.requests
            .as_deref_mut()
            .map(RequestManager::admin_stream_mut)
    }

    // ── Box lifecycle ────────────────────────────────────────────────────────

    /// Append a box without telling anyone.
    pub fn add_box(&mut self, stream_box: StreamBox) -> String {
        let unique = stream_box.unique.clone();
        self.boxes.push(stream_box);
        unique
    }

    /// Append a box and send it to every session allowed to see it.
    pub fn create_and_broadcast(&mut self, stream_box: StreamBox) -> String {
        let attached = self
            .sessions
            .iter()
            .filter(|i| Dispatcher::handlers_attached(&stream_box, i))
            .count();
        let delivered = Dispatcher::send_new_box(&stream_box, &self.sessions);
        debug!(
            unique = %stream_box.unique,
            kind = stream_box.kind.name(),
            attached,
            delivered,
            "box created"
        );
        self.add_box(stream_box)
    }

    pub fn remove(&mut self, unique: &str) -> bool {
        let before = self.boxes.len();
        self.boxes.retain(|b| b.unique != unique);
        self.boxes.len() != before
    }

    // ── Broadcast ────────────────────────────────────────────────────────────

    pub fn broadcast_updated_box(&self, unique: &str) -> bool {
        match self.find_box(unique) {
            Some(b) => {
                Dispatcher::send_updated_box(b, &self.sessions);
                true
            },
            None => false,
        }
    }

    pub fn broadcast_roster(&self) -> usize {
        Dispatcher::send_roster_to_all(&self.sessions)
    }

    pub fn broadcast_stream(&self) -> usize {
        Dispatcher::send_stream_to_all(&self.boxes, &self.sessions)
    }

    /// Send the full box collection to `id`, then the roster to everyone.
    pub fn resync(&self, id: u64) -> Result<(), StreamError> {
        let identity = self
            .sessions
            .find(id)
            .ok_or_else(|| StreamError::NotFound(format!("identity {id}")))?;
        if !Dispatcher::send_stream(&self.boxes, identity) {
            debug!(id, "resync target unreachable");
        }
        self.broadcast_roster();
        Ok(())
    }

    // ── Box events ───────────────────────────────────────────────────────────

    /// Route a join/leave to a box and broadcast its new state.
    ///
    /// The update is broadcast even when a join is refused for capacity, so
    /// every client converges on the server's view.
    pub fn handle_box_event(
        &mut self,
        actor_id: u64,
        unique: &str,
        event: BoxEvent,
    ) -> Result<MembershipChange, StreamError> {
        let actor = self
            .sessions
            .find(actor_id)
            .ok_or_else(|| StreamError::NotFound(format!("identity {actor_id}")))?;
        let idx = self
            .boxes
            .iter()
            .position(|b| b.unique == unique)
            .ok_or_else(|| StreamError::NotFound(format!("box {unique}")))?;
        if !Dispatcher::handlers_attached(&self.boxes[idx], actor) {
            return Err(StreamError::PermissionDenied(
                "You do not have permission to use this box!".into(),
            ));
        }
        let actor = actor.public();

        let change = self.boxes[idx].on_event(event, &actor)?;
        Dispatcher::send_updated_box(&self.boxes[idx], &self.sessions);
        debug!(unique, actor = actor.id, ?event, ?change, "box event");

        match change {
            MembershipChange::Full => Err(StreamError::CapacityExceeded(unique.to_string())),
            other => Ok(other),
        }
    }

    // ── Requests ─────────────────────────────────────────────────────────────

    /// Create an event, directly or through admin approval depending on the
    /// policy and the actor's privilege.
    pub fn request_event_creation(
        &mut self,
        actor_id: u64,
        title: &str,
        capacity: i64,
    ) -> Result<Submission, StreamError> {
        let privileged = self
            .sessions
            .find(actor_id)
            .ok_or_else(|| StreamError::NotFound(format!("identity {actor_id}")))?
            .privileged;
        if self.policy.events_admin_only && !privileged {
            return Err(StreamError::PermissionDenied(
                "You do not have permission to create events!".into(),
            ));
        }
        if u32::try_from(capacity).is_err() {
            warn!(actor = actor_id, capacity, "refusing event with out of range capacity");
            return Err(StreamError::InvalidArgument(format!(
                "event capacity {capacity}"
            )));
        }

        let action = PendingAction::CreateEvent {
            title: title.to_string(),
            capacity,
        };
        if !self.policy.gate_event_creation {
            self.execute(action, actor_id)?;
            return Ok(Submission::Executed);
        }
        self.submit_request(actor_id, action)
    }

    /// Queue `action` for admin approval.
    ///
    /// Privileged requestors bypass the queue. A requestor holds at most one
    /// open request: a newer one supersedes the older, which is denied.
    pub fn submit_request(
        &mut self,
        requestor_id: u64,
        action: PendingAction,
    ) -> Result<Submission, StreamError> {
        let (privileged, requestor) = {
            let identity = self
                .sessions
                .find(requestor_id)
                .ok_or_else(|| StreamError::NotFound(format!("identity {requestor_id}")))?;
            (identity.privileged, identity.public())
        };
        if privileged {
            self.execute(action, requestor_id)?;
            return Ok(Submission::Bypassed);
        }
        if self.requests.is_none() {
            return Err(StreamError::PermissionDenied(
                "This stream does not accept requests.".into(),
            ));
        }

        let previous = self
            .requests
            .as_deref_mut()
            .and_then(|m| m.take_open_for(requestor_id));
        let superseded = previous.as_ref().map(|r| r.unique.clone());
        if let Some(previous) = previous {
            self.conclude(previous, Resolution::Superseded);
        }

        let description = action.describe();
        let manager = self.requests.as_deref_mut().ok_or_else(|| {
            StreamError::PermissionDenied("This stream does not accept requests.".into())
        })?;
        let unique = manager.open(requestor, description, action);
        Ok(Submission::Opened { unique, superseded })
    }

    /// Accept or deny a pending request. Unknown or already resolved uniques
    /// are ignored and return `None`.
    pub fn resolve_request(&mut self, unique: &str, accepted: bool) -> Option<Resolution> {
        let Some(request) = self.requests.as_deref_mut().and_then(|m| m.take(unique)) else {
            debug!(unique, "request already resolved or unknown");
            return None;
        };
        let resolution = if accepted {
            Resolution::Accepted
        } else {
            Resolution::Denied
        };
        self.conclude(request, resolution);
        Some(resolution)
    }

    fn conclude(&mut self, request: PendingRequest, resolution: Resolution) {
        let notice = request.notice();
        info!(
            unique = %request.unique,
            requestor = request.requestor.id,
            ?resolution,
            "request resolved"
        );
        let frame = match resolution {
            Resolution::Accepted => {
                match self.execute(request.action.clone(), request.requestor.id) {
                    Ok(()) => ServerFrame::RequestAccepted(notice),
                    Err(e) => {
                        warn!(unique = %request.unique, error = %e, "accepted request failed to apply");
                        ServerFrame::RequestDenied(notice)
                    },
                }
            },
            Resolution::Denied | Resolution::Superseded => ServerFrame::RequestDenied(notice),
        };

        // Look the requestor up now: they may have reconnected on a new socket.
        match self.sessions.find(request.requestor.id) {
            Some(requestor) if Dispatcher::send_to(requestor, &frame) => {},
            _ => debug!(requestor = request.requestor.id, "requestor offline, notice dropped"),
        }

        if let Some(manager) = self.requests.as_deref_mut() {
            manager.retire(&request.unique);
        }
    }

    fn execute(&mut self, action: PendingAction, requestor_id: u64) -> Result<(), StreamError> {
        match action {
            PendingAction::CreateEvent { title, capacity } => {
                let host = self
                    .sessions
                    .find(requestor_id)
                    .map(|i| i.public())
                    .ok_or_else(|| StreamError::NotFound(format!("identity {requestor_id}")))?;
                let event = EventBox::new(title, host, capacity)
                    .inspect_err(|e| warn!(requestor = requestor_id, error = %e, "event refused"))?;
                self.create_and_broadcast(StreamBox::event(event));
                Ok(())
            },
        }
    }

    // ── Private messaging ────────────────────────────────────────────────────

    /// Deliver a private message. Returns whether it reached the recipient.
    pub fn send_private_message(
        &self,
        from_id: u64,
        to_id: u64,
        message: &str,
    ) -> Result<bool, StreamError> {
        if !self.policy.private_messaging {
            debug!(from = from_id, "private messaging disabled, message dropped");
            return Ok(false);
        }
        let from = self
            .sessions
            .find(from_id)
            .ok_or_else(|| StreamError::NotFound(format!("identity {from_id}")))?
            .public();
        let to = self
            .sessions
            .find(to_id)
            .ok_or_else(|| StreamError::NotFound(format!("identity {to_id}")))?;
        if !to.pm_enabled {
            return Ok(false);
        }
        Ok(Dispatcher::send_to(to, &ServerFrame::PrivateMessage {
            from,
            message: message.to_string(),
        }))
    }

    pub fn set_private_messaging(&mut self, enabled: bool) {
        self.policy.private_messaging = enabled;
        self.sessions.set_pm_enabled_all(enabled);
        info!(enabled, "private messaging toggled");
        self.broadcast_roster();
    }
}
