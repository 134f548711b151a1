// Message dispatcher: fakes the network round trip for a locally authored message
// with timer delays, then produces a reply from a `ReplySource`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, error, info};
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{clock_time, ChatEvent, IdGenerator, OutgoingMessage};
use crate::api::{ApiClient, ChatRequest};
use crate::fixtures::{CANNED_REPLIES, FALLBACK_REPLY, SEND_ERROR_REPLY};
use crate::models::{DeliveryStatus, Message, Sender};

/// Where replies come from
#[async_trait]
pub trait ReplySource: Send + Sync {
    async fn reply(&self, outgoing: &OutgoingMessage) -> Result<String>;
}

/// Picks one of the fixed canned replies at random
pub struct CannedReplies;

#[async_trait]
impl ReplySource for CannedReplies {
    async fn reply(&self, _outgoing: &OutgoingMessage) -> Result<String> {
        let mut rng = rand::thread_rng();
        CANNED_REPLIES
            .choose(&mut rng)
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("no canned replies configured"))
    }
}

/// Asks the chat backend for a reply
pub struct RemoteReplies {
    api: ApiClient,
    chat_url: String,
}

impl RemoteReplies {
    pub fn new(api: ApiClient, chat_url: &str) -> Self {
        RemoteReplies {
            api,
            chat_url: chat_url.to_string(),
        }
    }
}

#[async_trait]
impl ReplySource for RemoteReplies {
    async fn reply(&self, outgoing: &OutgoingMessage) -> Result<String> {
        let request = ChatRequest {
            message: outgoing.text.clone(),
            user_id: outgoing.user_id.clone(),
            conversation_id: outgoing.contact_id,
        };
        let reply = self.api.send_chat(&self.chat_url, &request).await?;
        Ok(reply.unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }
}

/// Simulated latencies
#[derive(Debug, Clone)]
pub struct DispatchTiming {
    /// Time before the local message is marked sent
    pub send_delay: Duration,
    /// The reply arrives after a random delay in this range
    pub reply_delay_min: Duration,
    pub reply_delay_max: Duration,
}

impl Default for DispatchTiming {
    fn default() -> Self {
        DispatchTiming {
            send_delay: Duration::from_millis(2000),
            reply_delay_min: Duration::from_millis(1000),
            reply_delay_max: Duration::from_millis(3000),
        }
    }
}

impl DispatchTiming {
    pub fn fixed(send_delay: Duration, reply_delay: Duration) -> Self {
        DispatchTiming {
            send_delay,
            reply_delay_min: reply_delay,
            reply_delay_max: reply_delay,
        }
    }

    pub fn reply_delay(&self) -> Duration {
        if self.reply_delay_max <= self.reply_delay_min {
            return self.reply_delay_min;
        }
        rand::thread_rng().gen_range(self.reply_delay_min..=self.reply_delay_max)
    }
}

pub struct MessageDispatcher {
    source: Arc<dyn ReplySource>,
    timing: DispatchTiming,
    ids: IdGenerator,
    event_tx: mpsc::Sender<ChatEvent>,
}

impl MessageDispatcher {
    pub fn new(
        source: Arc<dyn ReplySource>,
        timing: DispatchTiming,
        ids: IdGenerator,
    ) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (event_tx, event_rx) = mpsc::channel(100);
        (
            MessageDispatcher {
                source,
                timing,
                ids,
                event_tx,
            },
            event_rx,
        )
    }

    /// Run the round trip for `outgoing` in the background
    pub fn dispatch(&self, outgoing: OutgoingMessage) -> JoinHandle<()> {
        let source = self.source.clone();
        let timing = self.timing.clone();
        let ids = self.ids.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            Self::round_trip(source, timing, ids, event_tx, outgoing).await;
        })
    }

    async fn round_trip(
        source: Arc<dyn ReplySource>,
        timing: DispatchTiming,
        ids: IdGenerator,
        event_tx: mpsc::Sender<ChatEvent>,
        outgoing: OutgoingMessage,
    ) {
        let contact_id = outgoing.contact_id;

        tokio::time::sleep(timing.send_delay).await;
        emit(&event_tx, ChatEvent::StatusChanged {
            contact_id,
            message_id: outgoing.message_id,
            status: DeliveryStatus::Sent,
        })
        .await;

        match source.reply(&outgoing).await {
            Ok(text) => {
                let delay = timing.reply_delay();
                debug!("Reply for message {} arrives in {:?}", outgoing.message_id, delay);
                tokio::time::sleep(delay).await;

                emit(&event_tx, ChatEvent::StatusChanged {
                    contact_id,
                    message_id: outgoing.message_id,
                    status: DeliveryStatus::Delivered,
                })
                .await;
                emit(&event_tx, ChatEvent::Received {
                    contact_id,
                    message: Message {
                        id: ids.next_id(),
                        text,
                        sender: Sender::Ai,
                        timestamp: clock_time(),
                        status: DeliveryStatus::Delivered,
                    },
                })
                .await;
                info!("Round trip for message {} complete", outgoing.message_id);
            }
            Err(e) => {
                error!("Failed to get a reply for message {}: {}", outgoing.message_id, e);
                emit(&event_tx, ChatEvent::StatusChanged {
                    contact_id,
                    message_id: outgoing.message_id,
                    status: DeliveryStatus::Error,
                })
                .await;
                emit(&event_tx, ChatEvent::Received {
                    contact_id,
                    message: Message {
                        id: ids.next_id(),
                        text: SEND_ERROR_REPLY.to_string(),
                        sender: Sender::Ai,
                        timestamp: clock_time(),
                        status: DeliveryStatus::Error,
                    },
                })
                .await;
            }
        }

        emit(&event_tx, ChatEvent::Finished { contact_id }).await;
    }
}

async fn emit(event_tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) {
    if let Err(e) = event_tx.send(event).await {
        error!("Failed to deliver chat event to the UI: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingReplies;

    #[async_trait]
    impl ReplySource for FailingReplies {
        async fn reply(&self, _outgoing: &OutgoingMessage) -> Result<String> {
            Err(anyhow!("network unreachable"))
        }
    }

    fn outgoing() -> OutgoingMessage {
        OutgoingMessage {
            contact_id: 2,
            message_id: 77,
            text: "oi".to_string(),
            user_id: "default".to_string(),
        }
    }

    fn status_event(status: DeliveryStatus) -> ChatEvent {
        ChatEvent::StatusChanged {
            contact_id: 2,
            message_id: 77,
            status,
        }
    }

    fn fast() -> DispatchTiming {
        DispatchTiming::fixed(Duration::from_millis(5), Duration::from_millis(5))
    }

    async fn collect(mut rx: mpsc::Receiver<ChatEvent>) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = matches!(event, ChatEvent::Finished { .. });
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn test_canned_round_trip_event_order() {
        let (dispatcher, rx) =
            MessageDispatcher::new(Arc::new(CannedReplies), fast(), IdGenerator::new());
        dispatcher.dispatch(outgoing()).await.unwrap();
        let events = collect(rx).await;

        assert_eq!(events.len(), 4);
        assert_eq!(events[0], status_event(DeliveryStatus::Sent));
        assert_eq!(events[1], status_event(DeliveryStatus::Delivered));
        match &events[2] {
            ChatEvent::Received { contact_id, message } => {
                assert_eq!(*contact_id, 2);
                assert_eq!(message.sender, Sender::Ai);
                assert_eq!(message.status, DeliveryStatus::Delivered);
                assert!(CANNED_REPLIES.contains(&message.text.as_str()));
            }
            other => panic!("expected a reply, got {:?}", other),
        }
        assert_eq!(events[3], ChatEvent::Finished { contact_id: 2 });
    }

    #[tokio::test]
    async fn test_failed_reply_marks_error() {
        let (dispatcher, rx) =
            MessageDispatcher::new(Arc::new(FailingReplies), fast(), IdGenerator::new());
        dispatcher.dispatch(outgoing()).await.unwrap();
        let events = collect(rx).await;

        assert_eq!(events[1], status_event(DeliveryStatus::Error));
        match &events[2] {
            ChatEvent::Received { message, .. } => {
                assert_eq!(message.text, SEND_ERROR_REPLY);
                assert_eq!(message.status, DeliveryStatus::Error);
            }
            other => panic!("expected an error reply, got {:?}", other),
        }
        assert!(matches!(events.last(), Some(ChatEvent::Finished { .. })));
    }

    #[test]
    fn test_reply_delay_stays_in_range() {
        let timing = DispatchTiming::default();
        for _ in 0..100 {
            let delay = timing.reply_delay();
            assert!(delay >= Duration::from_millis(1000) && delay <= Duration::from_millis(3000));
        }
        assert_eq!(fast().reply_delay(), Duration::from_millis(5));
    }
}
