//! Fan-out of stream content to connected sessions.
//!
//! The dispatcher is stateless: every call takes the boxes and the session
//! registry it should work on, and returns how many sessions were reached.
//! Serialization failures and dead sockets are logged, never propagated.

use {
    lansite_protocol::ServerFrame,
    lansite_sessions::{Identity, SessionRegistry},
    tracing::{debug, warn},
};

use crate::boxes::StreamBox;

pub struct Dispatcher;

impl Dispatcher {
    /// Whether `identity` may see and act on `stream_box`.
    pub fn handlers_attached(stream_box: &StreamBox, identity: &Identity) -> bool {
        !stream_box.admin_only || identity.privileged
    }

    fn encode(frame: &ServerFrame) -> Option<String> {
        frame
            .to_json()
            .inspect_err(|e| warn!(event = frame.event(), error = %e, "failed to encode frame"))
            .ok()
    }

    fn fan_out<'a>(frame: &ServerFrame, targets: impl Iterator<Item = &'a Identity>) -> usize {
        let Some(json) = Self::encode(frame) else {
            return 0;
        };
        let mut delivered = 0;
        for identity in targets {
            if identity.send(&json) {
                delivered += 1;
            } else {
                debug!(id = identity.id, event = frame.event(), "session unreachable");
            }
        }
        delivered
    }

    pub fn send_to(identity: &Identity, frame: &ServerFrame) -> bool {
        Self::encode(frame).is_some_and(|json| identity.send(&json))
    }

    fn send_box(stream_box: &StreamBox, sessions: &SessionRegistry, frame: ServerFrame) -> usize {
        let delivered = Self::fan_out(
            &frame,
            sessions
                .online()
                .filter(|i| Self::handlers_attached(stream_box, i)),
        );
        debug!(
            unique = %stream_box.unique,
            event = frame.event(),
            delivered,
            "box dispatched"
        );
        delivered
    }

    pub fn send_new_box(stream_box: &StreamBox, sessions: &SessionRegistry) -> usize {
        let Some(snapshot) = stream_box.to_snapshot() else {
            return 0;
        };
        Self::send_box(stream_box, sessions, ServerFrame::BoxCreated(snapshot))
    }

    pub fn send_updated_box(stream_box: &StreamBox, sessions: &SessionRegistry) -> usize {
        let Some(snapshot) = stream_box.to_snapshot() else {
            return 0;
        };
        Self::send_box(stream_box, sessions, ServerFrame::BoxUpdated(snapshot))
    }

    fn stream_snapshot(boxes: &[StreamBox], identity: &Identity) -> ServerFrame {
        ServerFrame::StreamSnapshot(
            boxes
                .iter()
                .filter(|b| Self::handlers_attached(b, identity))
                .filter_map(StreamBox::to_snapshot)
                .collect(),
        )
    }

    /// Full box collection to a single session, in insertion order.
    pub fn send_stream(boxes: &[StreamBox], identity: &Identity) -> bool {
        Self::send_to(identity, &Self::stream_snapshot(boxes, identity))
    }

    pub fn send_stream_to_all(boxes: &[StreamBox], sessions: &SessionRegistry) -> usize {
        sessions
            .online()
            .filter(|i| Self::send_stream(boxes, i))
            .count()
    }

    pub fn send_roster_to_all(sessions: &SessionRegistry) -> usize {
        let frame = ServerFrame::RosterUpdated(sessions.public_roster());
        Self::fan_out(&frame, sessions.online())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::boxes::EventBox,
        lansite_sessions::{Connection, generate_secret},
        secrecy::ExposeSecret,
        tokio::sync::mpsc::UnboundedReceiver,
    };

    fn online(
        sessions: &mut SessionRegistry,
        name: &str,
        privileged: bool,
    ) -> (u64, UnboundedReceiver<String>) {
        let secret = generate_secret();
        let plain = secret.expose_secret().clone();
        let id = sessions.register(secret, None, name, None).id;
        sessions.set_privileged(id, privileged).unwrap();
        let (conn, rx) = Connection::channel(format!("conn-{id}"));
        sessions.reconnect(id, &plain, conn).unwrap();
        (id, rx)
    }

    fn events(rx: &mut UnboundedReceiver<String>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            out.push(serde_json::from_str(&raw).unwrap());
        }
        out
    }

    #[test]
    fn admin_only_box_reaches_privileged_sessions_only() {
        let mut sessions = SessionRegistry::new(true);
        let (_, mut admin_rx) = online(&mut sessions, "admin", true);
        let (_, mut user_rx) = online(&mut sessions, "user", false);

        let mut secret_box = StreamBox::text("ops", "only ops");
        secret_box.admin_only = true;

        assert_eq!(Dispatcher::send_new_box(&secret_box, &sessions), 1);
        assert_eq!(events(&mut admin_rx).len(), 1);
        assert!(events(&mut user_rx).is_empty());
    }

    #[test]
    fn offline_sessions_are_skipped() {
        let mut sessions = SessionRegistry::new(true);
        let (_, mut rx) = online(&mut sessions, "here", false);
        sessions.register(generate_secret(), None, "away", None);

        let b = StreamBox::text("hello", "world");
        assert_eq!(Dispatcher::send_new_box(&b, &sessions), 1);
        let got = events(&mut rx);
        assert_eq!(got[0]["event"], "box.created");
        assert_eq!(got[0]["payload"]["unique"], b.unique.as_str());
    }

    #[test]
    fn snapshot_keeps_insertion_order_and_hides_admin_boxes() {
        let mut sessions = SessionRegistry::new(true);
        let (host, mut rx) = online(&mut sessions, "user", false);
        let host = sessions.find(host).unwrap().public();

        let first = StreamBox::text("first", "1");
        let mut hidden = StreamBox::text("hidden", "2");
        hidden.admin_only = true;
        let last = StreamBox::event(EventBox::new("last", host, 3).unwrap());
        let boxes = vec![first.clone(), hidden, last.clone()];

        assert_eq!(Dispatcher::send_stream_to_all(&boxes, &sessions), 1);
        let got = events(&mut rx);
        let payload = got[0]["payload"].as_array().unwrap();
        let uniques: Vec<_> = payload.iter().map(|b| b["unique"].clone()).collect();
        assert_eq!(uniques, vec![
            serde_json::Value::from(first.unique),
            serde_json::Value::from(last.unique),
        ]);
    }

    #[test]
    fn roster_never_carries_secrets() {
        let mut sessions = SessionRegistry::new(true);
        let (_, mut rx) = online(&mut sessions, "someone", false);
        Dispatcher::send_roster_to_all(&sessions);
        let raw = rx.try_recv().unwrap();
        assert!(raw.contains("roster.updated"));
        assert!(!raw.contains("secret"));
    }
}
