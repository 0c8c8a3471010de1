mod cache;
mod service;

pub use cache::MissionTimeView;
pub use service::Aggregator;
