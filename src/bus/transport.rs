use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;

use super::error::{BusError, MessageError};
use super::topic::{nats_subject_to_topic, topic_to_nats_subject, Topic, TopicFilter};

const INBOUND_CAPACITY: usize = 256;

/// One message as it travels over the bus: a topic path and a JSON payload.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        serde_json::from_slice(&self.payload).map_err(|source| MessageError::Decode {
            topic: self.topic.clone(),
            source,
        })
    }
}

/// Inbound side of a subscription. Messages are forwarded by a background
/// task, so the owner consumes them from a single loop.
pub struct Subscription {
    rx: mpsc::Receiver<Envelope>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

#[derive(Clone)]
enum Transport {
    Memory(broadcast::Sender<Envelope>),
    Nats(async_nats::Client),
}

/// Fire-and-forget publish/subscribe bus.
#[derive(Clone)]
pub struct Bus {
    transport: Transport,
}

impl Bus {
    /// In-process bus. Subscribers that fall more than `capacity` messages
    /// behind skip the oldest ones.
    pub fn memory(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            transport: Transport::Memory(tx),
        }
    }

    pub async fn nats(url: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connect(format!("{}: {}", url, e)))?;
        log::info!("Connected to NATS at {}", url);
        Ok(Self {
            transport: Transport::Nats(client),
        })
    }

    pub async fn publish<T: Serialize>(&self, topic: &Topic, message: &T) -> Result<(), BusError> {
        let payload = serde_json::to_vec(message)?;
        self.publish_raw(&topic.path(), payload).await
    }

    pub async fn publish_raw(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        match &self.transport {
            Transport::Memory(tx) => {
                let envelope = Envelope {
                    topic: topic.to_string(),
                    payload,
                };
                // No subscribers is not an error for a broadcast.
                if tx.send(envelope).is_err() {
                    log::debug!("No subscribers for {}", topic);
                }
                Ok(())
            }
            Transport::Nats(client) => client
                .publish(topic_to_nats_subject(topic), payload.into())
                .await
                .map_err(|e| BusError::Publish {
                    topic: topic.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    pub async fn subscribe(&self, filters: &[TopicFilter]) -> Result<Subscription, BusError> {
        let (fwd_tx, fwd_rx) = mpsc::channel(INBOUND_CAPACITY);

        match &self.transport {
            Transport::Memory(tx) => {
                let rx = tx.subscribe();
                tokio::spawn(forward_memory(rx, filters.to_vec(), fwd_tx));
            }
            Transport::Nats(client) => {
                let mut subscribers = Vec::with_capacity(filters.len());
                for filter in filters {
                    let subscriber = client
                        .subscribe(filter.nats_subject())
                        .await
                        .map_err(|e| BusError::Subscribe {
                            filter: filter.to_string(),
                            message: e.to_string(),
                        })?;
                    subscribers.push(subscriber.boxed());
                }
                tokio::spawn(async move {
                    let mut merged = stream::select_all(subscribers);
                    while let Some(message) = merged.next().await {
                        let envelope = Envelope {
                            topic: nats_subject_to_topic(&message.subject.to_string()),
                            payload: message.payload.to_vec(),
                        };
                        if fwd_tx.send(envelope).await.is_err() {
                            break;
                        }
                    }
                });
            }
        }

        Ok(Subscription { rx: fwd_rx })
    }
}

async fn forward_memory(
    mut rx: broadcast::Receiver<Envelope>,
    filters: Vec<TopicFilter>,
    fwd_tx: mpsc::Sender<Envelope>,
) {
    loop {
        match rx.recv().await {
            Ok(envelope) => {
                if !filters.iter().any(|f| f.matches(&envelope.topic)) {
                    continue;
                }
                if fwd_tx.send(envelope).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Bus subscriber lagged, skipped {} messages", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
