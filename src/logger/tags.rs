/// Log tags identifying the subsystem a message comes from
///
/// Each tag maps to a `--debug-<key>` / `--verbose-<key>` command-line flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Api,
    Queue,
    Cache,
    Scheduler,
    Votes,
    Gateway,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used by `--debug-<key>` flags and the `enabled_tags` filter
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Api => "api".to_string(),
            LogTag::Queue => "queue".to_string(),
            LogTag::Cache => "cache".to_string(),
            LogTag::Scheduler => "scheduler".to_string(),
            LogTag::Votes => "votes".to_string(),
            LogTag::Gateway => "gateway".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uncolored label used in log files
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Other(name) => name.to_uppercase(),
            other => other.to_debug_key().to_uppercase(),
        }
    }

    /// Parse a debug key back into a tag (used when scanning `--debug-*` flags)
    pub fn from_debug_key(key: &str) -> LogTag {
        match key {
            "system" => LogTag::System,
            "config" => LogTag::Config,
            "api" => LogTag::Api,
            "queue" => LogTag::Queue,
            "cache" => LogTag::Cache,
            "scheduler" => LogTag::Scheduler,
            "votes" => LogTag::Votes,
            "gateway" => LogTag::Gateway,
            "test" => LogTag::Test,
            other => LogTag::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
