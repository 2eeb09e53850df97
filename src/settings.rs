//! Process settings resolved at startup

use query_bench_core::{LoadError, LoadResult, TopicPath};

/// Environment variable naming the launch topic
pub const LAUNCH_QUERIES_TOPIC: &str = "LAUNCH_QUERIES_TOPIC";

/// Environment variable naming the project owning the launch topic
pub const ADMIN_PROJECT: &str = "ADMIN_PROJECT";

/// Dispatcher settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherSettings {
    /// Launch topic in the admin project
    pub topic: TopicPath,
}

impl DispatcherSettings {
    /// Build from optional values, failing fast on absent or empty ones
    pub fn resolve(topic: Option<String>, admin_project: Option<String>) -> LoadResult<Self> {
        let topic = required(topic, LAUNCH_QUERIES_TOPIC)?;
        let admin_project = required(admin_project, ADMIN_PROJECT)?;
        Ok(Self {
            topic: TopicPath::new(admin_project, topic),
        })
    }

    /// Read both values from the process environment
    pub fn from_env() -> LoadResult<Self> {
        Self::resolve(
            std::env::var(LAUNCH_QUERIES_TOPIC).ok(),
            std::env::var(ADMIN_PROJECT).ok(),
        )
    }
}

fn required(value: Option<String>, name: &str) -> LoadResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Some(_) => Err(LoadError::configuration(format!("{name} is set but empty"))),
        None => Err(LoadError::configuration(format!("{name} is not set"))),
    }
}
