use tokio::sync::mpsc;

use ws::Message;

/// Outbound queue depth for live fan-out. Small and intentional: it forces
/// best-effort drops on a misbehaving/slow peer rather than unbounded memory
/// growth.
const OUTBOUND_CAPACITY: usize = 8;

/// A unique id for a connection within its room hub.
pub type ConnId = u64;

/// A live client connection's outbound side: a bounded channel drained by a
/// dedicated writer task. Two enqueue modes share the same channel:
///
/// - [`Connection::enqueue`] is best-effort: live fan-out must never block,
///   so a full channel silently drops the message.
/// - [`Connection::enqueue_reliable`] blocks until space exists or the
///   channel closes, used for history replay where loss would corrupt the
///   client's view.
#[derive(Clone)]
pub struct Connection {
    pub id: ConnId,
    sender: mpsc::Sender<Message>,
}

impl Connection {
    /// Creates a connection and its paired receiver, which the writer loop
    /// drains into the socket.
    pub fn new(id: ConnId) -> (Self, mpsc::Receiver<Message>) {
        let (sender, receiver) = mpsc::channel(OUTBOUND_CAPACITY);
        (Connection { id, sender }, receiver)
    }

    /// Non-blocking send. Drops the message if the channel is full or
    /// closed; never blocks the caller (the hub broadcaster).
    pub fn enqueue(&self, message: Message) {
        if self.sender.try_send(message).is_err() {
            log::debug!("dropped message for connection {}: outbound queue full or closed", self.id);
        }
    }

    /// Blocking send used by history replay. Waits for capacity; returns an
    /// error only once the connection has closed.
    pub async fn enqueue_reliable(&self, message: Message) -> Result<(), ()> {
        self.sender.send(message).await.map_err(|_| ())
    }
}
