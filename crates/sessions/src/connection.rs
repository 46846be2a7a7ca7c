use {std::time::Instant, tokio::sync::mpsc};

/// Live socket handle of an online identity.
///
/// Frames are pushed into an unbounded channel drained by the socket's write
/// loop, so sending never waits on a slow client.
#[derive(Debug, Clone)]
pub struct Connection {
    conn_id: String,
    sender: mpsc::UnboundedSender<String>,
    connected_at: Instant,
}

impl Connection {
    pub fn new(conn_id: impl Into<String>, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            conn_id: conn_id.into(),
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Build a connection together with the receiving half of its channel.
    pub fn channel(conn_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(conn_id, tx), rx)
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub fn connected_secs(&self) -> u64 {
        self.connected_at.elapsed().as_secs()
    }

    /// Send a serialized JSON frame. Returns false if the socket is gone.
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(frame.to_string()).is_ok()
    }
}
