//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/dramatis/config.toml` (XDG) or platform config dir
//! 2. Project config: `.dramatis.toml`
//! 3. Environment variables: `DRAMATIS_*`, nested with `__`
//!    (e.g. `DRAMATIS_SIMULATION__MAX_CONCURRENCY=8`)
//!
//! Every field has a default, so running without any config file is valid.
//!
//! ```toml
//! [llm]
//! timeout_ms = 90000
//!
//! [simulation]
//! max_concurrency = 8
//!
//! [sampling]
//! seed = 42
//! ```

use std::ops::Deref;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub generation: GenerationConfig,
    pub simulation: SimulationConfig,
    pub planner: PlannerConfig,
    pub sampling: SamplingConfig,
}

/// Settings shared by every call to the LLM collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Per-call timeout in milliseconds. A timeout counts as a collaborator failure.
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { timeout_ms: 120_000 }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

/// Entity generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backstory calls in flight at once.
    pub max_concurrency: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

/// Batch simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Component simulations run at once by the batch worker pool.
    pub max_concurrency: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

/// Combination planner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Largest combination space that is enumerated instead of sampled.
    pub exhaustive_limit: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            exhaustive_limit: crate::planner::DEFAULT_EXHAUSTIVE_LIMIT,
        }
    }
}

/// Randomness settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Seed used when a caller does not supply one. Unset means fresh entropy.
    pub seed: Option<u64>,
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                // Layer 1: User config (lowest priority)
                .merge(Toml::file(Self::user_config_path()))
                // Layer 2: Project config
                .merge(Toml::file(".dramatis.toml"))
                // Layer 3: Environment variables (highest priority)
                .merge(Env::prefixed("DRAMATIS_").split("__")),
        )
    }

    /// Extract a config from an arbitrary provider stack.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(ConfigError::from)
    }

    /// User config path: ~/.config/dramatis/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("dramatis").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join("dramatis").join("config.toml"))
            .unwrap_or_default()
    }
}
