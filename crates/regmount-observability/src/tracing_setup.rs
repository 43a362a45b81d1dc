//! Subscriber installation for RegMount binaries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How much to log, per crate, and in which format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Level for everything without an override, e.g. `"warn"`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Crate name to level, e.g. `regmount-mount` → `debug`.
    #[serde(default)]
    pub components: BTreeMap<String, String>,
    /// One JSON object per event instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: BTreeMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_component(
        mut self,
        component: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        self.components.insert(component.into(), level.into());
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// `EnvFilter` directives, e.g. `"info,regmount_mount=debug"`.
    /// Crate names are given with dashes; targets use underscores.
    pub fn directives(&self) -> String {
        std::iter::once(self.level.clone())
            .chain(
                self.components
                    .iter()
                    .map(|(component, level)| format!("{}={level}", component.replace('-', "_"))),
            )
            .collect::<Vec<_>>()
            .join(",")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.directives()))
            .unwrap_or_else(|_| EnvFilter::new(default_level()))
    }
}

/// Install the global subscriber. Call once, from `main`; libraries only emit.
/// A set `RUST_LOG` overrides the config's directives.
pub fn init_tracing(config: &LogConfig) {
    let json = config.json.then(|| fmt::layer().json());
    let text = (!config.json).then(fmt::layer);
    tracing_subscriber::registry()
        .with(config.filter())
        .with(json)
        .with(text)
        .init();
}
