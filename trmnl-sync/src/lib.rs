pub mod config {
    use serde::Deserialize;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::todoist::{DEFAULT_REST_URL, DEFAULT_SYNC_URL};
    use crate::trmnl::{DEFAULT_COUNTDOWN_ENDPOINT, DEFAULT_TODOIST_ENDPOINT};

    #[derive(Deserialize, Clone)]
    pub struct Config {
        pub api_key: String,
        pub label: String,
        #[serde(default = "default_todoist_endpoint")]
        pub todoist_endpoint: String,
        #[serde(default = "default_countdown_endpoint")]
        pub countdown_endpoint: String,
        #[serde(default = "default_polling_interval_minutes")]
        pub trmnl_polling_interval_minutes: u64,
        #[serde(default = "default_data_file")]
        pub data_file: PathBuf,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default = "default_rest_url")]
        pub todoist_rest_url: String,
        #[serde(default = "default_sync_url")]
        pub todoist_sync_url: String,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_environment(config::Environment::default())
        }

        /// Loads configuration from the given environment source.
        pub fn from_environment(environment: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(environment)
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Time between two sync cycles.
        pub fn polling_interval(&self) -> Duration {
            Duration::from_secs(self.trmnl_polling_interval_minutes * 60)
        }
    }

    // Keeps the API key out of logs.
    impl std::fmt::Debug for Config {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Config")
                .field("label", &self.label)
                .field("todoist_endpoint", &self.todoist_endpoint)
                .field("countdown_endpoint", &self.countdown_endpoint)
                .field(
                    "trmnl_polling_interval_minutes",
                    &self.trmnl_polling_interval_minutes,
                )
                .field("data_file", &self.data_file)
                .field("port", &self.port)
                .field("todoist_rest_url", &self.todoist_rest_url)
                .field("todoist_sync_url", &self.todoist_sync_url)
                .finish_non_exhaustive()
        }
    }

    fn default_todoist_endpoint() -> String {
        DEFAULT_TODOIST_ENDPOINT.to_string()
    }

    fn default_countdown_endpoint() -> String {
        DEFAULT_COUNTDOWN_ENDPOINT.to_string()
    }

    fn default_polling_interval_minutes() -> u64 {
        720
    }

    fn default_data_file() -> PathBuf {
        PathBuf::from("/data/countdowns.json")
    }

    fn default_port() -> u16 {
        5000
    }

    fn default_rest_url() -> String {
        DEFAULT_REST_URL.to_string()
    }

    fn default_sync_url() -> String {
        DEFAULT_SYNC_URL.to_string()
    }

}

pub mod countdown;
pub mod progress;
pub mod sync;
pub mod todoist;
pub mod tracking;
pub mod trmnl;
pub mod web;
