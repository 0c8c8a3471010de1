use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus connection failed: {0}")]
    Connect(String),
    #[error("subscribe to {filter} failed: {message}")]
    Subscribe { filter: String, message: String },
    #[error("publish to {topic} failed: {message}")]
    Publish { topic: String, message: String },
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A message that could not be turned into a typed value. Always recoverable:
/// the message is dropped and nothing else is affected.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("unknown topic {0}")]
    UnknownTopic(String),
    #[error("malformed payload on {topic}: {source}")]
    Decode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("topic {topic} carries telemetry for sat_id {sat_id}")]
    TopicMismatch { topic: String, sat_id: String },
}
