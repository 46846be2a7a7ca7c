use {lansite_protocol::PublicIdentity, serde::Serialize, tracing::debug};

use crate::error::StreamError;

/// What a join or leave did to the member list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Joined,
    AlreadyMember,
    /// The event is at capacity; the list is unchanged.
    Full,
    Left,
    NotMember,
}

/// A capacity-limited gathering that participants can join and leave.
///
/// The host is enrolled as the first member on creation and counts towards
/// `capacity`. A capacity of zero means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventBox {
    pub title: String,
    pub host: PublicIdentity,
    pub capacity: u32,
    members: Vec<PublicIdentity>,
}

impl EventBox {
    pub fn new(
        title: impl Into<String>,
        host: PublicIdentity,
        capacity: i64,
    ) -> Result<Self, StreamError> {
        let title = title.into();
        let capacity = u32::try_from(capacity)
            .map_err(|_| StreamError::InvalidArgument(format!("event capacity {capacity}")))?;
        Ok(Self {
            title,
            members: vec![host.clone()],
            host,
            capacity,
        })
    }

    pub fn members(&self) -> &[PublicIdentity] {
        &self.members
    }

    pub fn is_member(&self, id: u64) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.members.len() >= self.capacity as usize
    }

    pub fn join(&mut self, who: &PublicIdentity) -> MembershipChange {
        if self.is_member(who.id) {
            return MembershipChange::AlreadyMember;
        }
        if self.is_full() {
            debug!(title = %self.title, id = who.id, "event full, join refused");
            return MembershipChange::Full;
        }
        self.members.push(who.clone());
        MembershipChange::Joined
    }

    /// Removes `id` if present. The host may leave their own event.
    pub fn leave(&mut self, id: u64) -> MembershipChange {
        let before = self.members.len();
        self.members.retain(|m| m.id != id);
        if self.members.len() == before {
            MembershipChange::NotMember
        } else {
            MembershipChange::Left
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn who(id: u64, name: &str) -> PublicIdentity {
        PublicIdentity {
            id,
            display_name: name.into(),
            privileged: false,
            pm_enabled: true,
        }
    }

    #[test]
    fn host_is_first_member() {
        let event = EventBox::new("LAN party", who(1, "host"), 4).unwrap();
        assert_eq!(event.members().len(), 1);
        assert_eq!(event.members()[0].id, 1);
        assert_eq!(event.host.id, 1);
    }

    #[test]
    fn negative_capacity_is_refused() {
        let err = EventBox::new("nope", who(1, "host"), -1).unwrap_err();
        assert!(matches!(err, StreamError::InvalidArgument(_)));
    }

    #[test]
    fn zero_capacity_is_unlimited() {
        let mut event = EventBox::new("open", who(1, "host"), 0).unwrap();
        for id in 2..50 {
            assert_eq!(event.join(&who(id, "guest")), MembershipChange::Joined);
        }
        assert_eq!(event.members().len(), 49);
        assert!(!event.is_full());
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let mut event = EventBox::new("duo", who(1, "host"), 2).unwrap();
        assert_eq!(event.join(&who(2, "b")), MembershipChange::Joined);
        assert_eq!(event.join(&who(3, "c")), MembershipChange::Full);
        assert_eq!(event.members().len(), 2);
        assert!(!event.is_member(3));
    }

    #[test]
    fn join_twice_keeps_one_entry() {
        let mut event = EventBox::new("x", who(1, "host"), 5).unwrap();
        event.join(&who(2, "b"));
        assert_eq!(event.join(&who(2, "b")), MembershipChange::AlreadyMember);
        assert_eq!(event.members().iter().filter(|m| m.id == 2).count(), 1);
    }

    #[test]
    fn leave_is_idempotent() {
        let mut event = EventBox::new("x", who(1, "host"), 5).unwrap();
        event.join(&who(2, "b"));
        assert_eq!(event.leave(2), MembershipChange::Left);
        assert_eq!(event.leave(2), MembershipChange::NotMember);
        assert_eq!(event.members().len(), 1);
    }

    #[test]
    fn leaving_frees_a_seat() {
        let mut event = EventBox::new("duo", who(1, "host"), 2).unwrap();
        event.join(&who(2, "b"));
        event.leave(2);
        assert_eq!(event.join(&who(3, "c")), MembershipChange::Joined);
    }
}
