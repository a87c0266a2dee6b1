//! Chat fan-out and per-session interception.
//!
//! Grounded on the original's `Chat` class: one dedicated broadcaster per
//! player that reads its own incoming stream and re-sends to everyone else.
//! There the broadcaster ran on a private event loop thread; here each
//! player's fan-out is just a reactor task, since the reactor is already
//! async.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::frame::{ChatControlState, ServerFrame};
use super::session::Session;

/// Installed on a `Spectator` while a chat stream is open for it. Strips the
/// leading `/` and forwards the rest to the owning stream; declines (returns
/// `false`) any frame that doesn't start with `/`, leaving it for the normal
/// inbound queue; chat only ever consumes `/`-prefixed frames.
pub struct Interceptor {
    tx: mpsc::UnboundedSender<String>,
}

impl Interceptor {
    pub fn try_consume(&self, text: &str) -> bool {
        match text.strip_prefix('/') {
            Some(rest) => {
                let _ = self.tx.send(rest.to_string());
                true
            }
            None => false,
        }
    }
}

/// A chat stream bound to one session. Installing it sends `chatcontrol:on`;
/// dropping it removes the interceptor and sends `chatcontrol:off`, mirroring
/// `NetworkChatStream.__init__`/`close` in the original.
pub struct ChatStream {
    session: Arc<Session>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl ChatStream {
    /// Fails if the session already has an interceptor installed (at most
    /// one chat stream open per session at a time).
    pub fn open(session: Arc<Session>) -> Result<Self, ()> {
        let (tx, rx) = mpsc::unbounded_channel();
        session.spectator().install_interceptor(Interceptor { tx })?;
        session.spectator().send_sync(ServerFrame::ChatControl {
            set: ChatControlState::On,
            message: Some("Start chatting...".to_string()),
        });
        Ok(Self { session, rx })
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.session.spectator().remove_interceptor();
        self.session.spectator().send_sync(ServerFrame::ChatControl {
            set: ChatControlState::Off,
            message: None,
        });
    }
}

/// Broadcasts messages among a fixed set of sessions: one reactor task per
/// session drains that session's chat stream and fans each message out to
/// every other session's outbound queue, tagged with the sender's username.
pub struct ChatRoom {
    tasks: Vec<JoinHandle<()>>,
}

impl ChatRoom {
    pub fn open(sessions: Vec<Arc<Session>>) -> Result<Self, ()> {
        let mut streams = Vec::with_capacity(sessions.len());
        for session in &sessions {
            streams.push(ChatStream::open(Arc::clone(session))?);
        }

        let tasks = streams
            .into_iter()
            .enumerate()
            .map(|(idx, mut stream)| {
                let sender_session = Arc::clone(&sessions[idx]);
                let others: Vec<Arc<Session>> = sessions
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != idx)
                    .map(|(_, s)| Arc::clone(s))
                    .collect();
                tokio::spawn(async move {
                    let sender_name = sender_session.username().unwrap_or_default();
                    while let Some(text) = stream.recv().await {
                        for other in &others {
                            other.spectator().send_sync(ServerFrame::Message {
                                text: text.clone(),
                                sender: Some(sender_name.clone()),
                                highlight: None,
                            });
                        }
                    }
                    // `stream` drops here: interceptor removed, chatcontrol:off sent.
                })
            })
            .collect();

        Ok(Self { tasks })
    }
}

impl Drop for ChatRoom {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::ServerFrame;
    use std::time::Duration;

    fn connected_session(seat: super::super::session::SeatId, username: &str) -> Arc<Session> {
        let session = Session::new(seat);
        session.try_claim(username).unwrap();
        session.spectator().mark_connected();
        session
    }

    #[tokio::test]
    async fn chat_room_fans_a_message_out_to_every_other_session() {
        let alice = connected_session(0, "alice");
        let bob = connected_session(1, "bob");
        let room = ChatRoom::open(vec![Arc::clone(&alice), Arc::clone(&bob)]).unwrap();

        // Both sessions get the `chatcontrol:on` frame from opening their stream.
        assert!(matches!(
            alice.spectator().recv_outbound().await.unwrap(),
            ServerFrame::ChatControl { set: ChatControlState::On, .. }
        ));
        assert!(matches!(
            bob.spectator().recv_outbound().await.unwrap(),
            ServerFrame::ChatControl { set: ChatControlState::On, .. }
        ));

        // A `/`-prefixed inbound frame on alice's connection is chat, not a
        // normal answer: it must never reach her own inbound queue...
        assert!(!alice.spectator().deliver_inbound("/hello everyone".to_string()));

        // ...and must be fanned out to bob, tagged with alice's name.
        let received = tokio::time::timeout(Duration::from_secs(1), bob.spectator().recv_outbound())
            .await
            .expect("bob should receive the chat message")
            .unwrap();
        match received {
            ServerFrame::Message { text, sender, .. } => {
                assert_eq!(text, "hello everyone");
                assert_eq!(sender.as_deref(), Some("alice"));
            }
            other => panic!("expected a chat message, got {other:?}"),
        }

        drop(room);
    }

    #[test]
    fn interceptor_declines_frames_without_a_leading_slash() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let interceptor = Interceptor { tx };
        assert!(!interceptor.try_consume("not chat"));
        assert!(interceptor.try_consume("/is chat"));
    }
}
