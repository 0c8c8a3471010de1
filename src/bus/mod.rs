mod error;
mod topic;
mod transport;

pub use error::{BusError, MessageError};
pub use topic::{is_valid_segment, Topic, TopicFilter};
pub use transport::{Bus, Envelope, Subscription};
