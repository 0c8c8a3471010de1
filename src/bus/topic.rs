use std::fmt;

pub const MISSION_TIME: &str = "mission/time";
pub const MISSION_METADATA: &str = "mission/metadata";
const SATELLITE_PREFIX: &str = "satellite";
const TELEMETRY_SUFFIX: &str = "telemetry";
const SINGLE_LEVEL_WILDCARD: &str = "+";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    MissionTime,
    MissionMetadata,
    Telemetry(String),
}

impl Topic {
    pub fn parse(path: &str) -> Option<Self> {
        match path {
            MISSION_TIME => return Some(Topic::MissionTime),
            MISSION_METADATA => return Some(Topic::MissionMetadata),
            _ => {}
        }

        let mut parts = path.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(SATELLITE_PREFIX), Some(sat_id), Some(TELEMETRY_SUFFIX), None)
                if is_valid_segment(sat_id) =>
            {
                Some(Topic::Telemetry(sat_id.to_string()))
            }
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Topic::MissionTime => MISSION_TIME.to_string(),
            Topic::MissionMetadata => MISSION_METADATA.to_string(),
            Topic::Telemetry(sat_id) => {
                format!("{}/{}/{}", SATELLITE_PREFIX, sat_id, TELEMETRY_SUFFIX)
            }
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// True when `segment` can be used as one level of a topic path on every
/// transport (no separators or wildcards of either MQTT or NATS flavour).
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment
            .chars()
            .any(|c| matches!(c, '/' | '.' | '+' | '#' | '*' | '>') || c.is_whitespace())
}

/// A topic pattern where `+` matches exactly one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    levels: Vec<String>,
}

impl TopicFilter {
    pub fn all_telemetry() -> Self {
        Self {
            levels: vec![
                SATELLITE_PREFIX.to_string(),
                SINGLE_LEVEL_WILDCARD.to_string(),
                TELEMETRY_SUFFIX.to_string(),
            ],
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').collect();
        parts.len() == self.levels.len()
            && self
                .levels
                .iter()
                .zip(parts)
                .all(|(level, part)| level == SINGLE_LEVEL_WILDCARD || level == part)
    }

    pub fn nats_subject(&self) -> String {
        self.levels
            .iter()
            .map(|l| if l == SINGLE_LEVEL_WILDCARD { "*" } else { l.as_str() })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl From<&Topic> for TopicFilter {
    fn from(topic: &Topic) -> Self {
        Self {
            levels: topic.path().split('/').map(String::from).collect(),
        }
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.levels.join("/"))
    }
}

pub fn topic_to_nats_subject(path: &str) -> String {
    path.replace('/', ".")
}

pub fn nats_subject_to_topic(subject: &str) -> String {
    subject.replace('.', "/")
}
