pub mod catalog;
pub mod domain;
pub mod engine;
pub mod error;

pub use engine::{Engine, EngineOptions};
pub use error::EngineError;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub catalog_path: Option<String>,
        pub decoder_path: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                catalog_path: non_empty_var("CATALOG_PATH"),
                decoder_path: non_empty_var("DECODER_PATH"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_catalog_path(&self) -> anyhow::Result<&str> {
            self.catalog_path
                .as_deref()
                .context("CATALOG_PATH is required")
        }

        pub fn require_decoder_path(&self) -> anyhow::Result<&str> {
            self.decoder_path
                .as_deref()
                .context("DECODER_PATH is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
