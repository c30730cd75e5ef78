use serde::{Deserialize, Serialize};

use crate::planner::{Bias, DEFAULT_THRESHOLD, Planner, Strategy};
use alloc::boxed::Box;

/// Settings of the array creation protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayConfig {
    /// Planner used to lay arrays out.
    #[serde(default)]
    pub strategy: Strategy,
    /// Ratio under which heuristics fall back to the exhaustive search.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Preferred axes of the prime factor heuristic.
    #[serde(default)]
    pub bias: Bias,
    /// Log every plan at info level instead of debug.
    #[serde(default)]
    pub verbose: bool,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            threshold: DEFAULT_THRESHOLD,
            bias: Bias::default(),
            verbose: false,
        }
    }
}

impl ArrayConfig {
    /// Sets the planning strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the fallback threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the bias of the prime factor heuristic.
    pub fn with_bias(mut self, bias: Bias) -> Self {
        self.bias = bias;
        self
    }

    /// Sets verbose plan logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The configured planner.
    pub fn planner(&self) -> Box<dyn Planner> {
        self.strategy.planner(self.threshold, self.bias)
    }
}

#[cfg(feature = "std")]
mod std_config {
    use super::ArrayConfig;
    use crate::planner::{Bias, Strategy};

    /// Errors while loading or saving an [`ArrayConfig`].
    #[derive(thiserror::Error, Debug)]
    pub enum ConfigError {
        /// The file could not be read or written.
        #[error("cannot access config file '{path}': {source}")]
        Io {
            /// Path of the file.
            path: String,
            /// Underlying error.
            source: std::io::Error,
        },
        /// The file is not a valid config.
        #[error("invalid config format: {0}")]
        InvalidFormat(#[from] serde_json::Error),
    }

    /// Environment variable selecting the planning strategy.
    pub const ENV_STRATEGY: &str = "DALEC_STRATEGY";
    /// Environment variable holding the fallback threshold.
    pub const ENV_THRESHOLD: &str = "DALEC_THRESHOLD";
    /// Environment variable holding the bias as a signed integer.
    pub const ENV_BIAS: &str = "DALEC_BIAS";
    /// Environment variable enabling verbose plan logging.
    pub const ENV_VERBOSE: &str = "DALEC_VERBOSE";

    impl ArrayConfig {
        /// Defaults overridden by the `DALEC_*` environment variables.
        ///
        /// Unparsable values keep their default.
        pub fn from_env() -> Self {
            Self::from_lookup(|name| std::env::var(name).ok())
        }

        pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
            let defaults = Self::default();
            let strategy = lookup(ENV_STRATEGY)
                .and_then(|value| match value.parse::<Strategy>() {
                    Ok(strategy) => Some(strategy),
                    Err(err) => {
                        log::warn!("{ENV_STRATEGY}: {err}");
                        None
                    }
                })
                .unwrap_or(defaults.strategy);
            let threshold = lookup(ENV_THRESHOLD)
                .and_then(|value| value.trim().parse::<f64>().ok())
                .unwrap_or(defaults.threshold);
            let bias = lookup(ENV_BIAS)
                .and_then(|value| value.trim().parse::<i64>().ok())
                .map(Bias::from)
                .unwrap_or(defaults.bias);
            let verbose = lookup(ENV_VERBOSE)
                .map(|value| parse_flag(&value))
                .unwrap_or(defaults.verbose);

            Self {
                strategy,
                threshold,
                bias,
                verbose,
            }
        }

        /// Reads a config saved as JSON.
        pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Ok(serde_json::from_str(&content)?)
        }

        /// Writes the config as JSON.
        pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
            let path = path.as_ref();
            let content = serde_json::to_string_pretty(self)?;
            std::fs::write(path, content).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    }

    /// `true` when the value starts with one of `T`, `t`, `Y`, `y` or `1`.
    fn parse_flag(value: &str) -> bool {
        matches!(value.chars().next(), Some('T' | 't' | 'Y' | 'y' | '1'))
    }
}

#[cfg(feature = "std")]
pub use std_config::*;

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_defaults_use_the_pinned_dispatcher() {
        let config = ArrayConfig::default();

        assert_eq!(config.strategy, Strategy::Pinned);
        assert_eq!(config.threshold, 0.1);
        assert_eq!(config.bias, Bias::Balanced);
        assert!(!config.verbose);
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = ArrayConfig::from_lookup(lookup(&[
            (ENV_STRATEGY, "h2"),
            (ENV_THRESHOLD, "0.75"),
            (ENV_BIAS, "-2"),
            (ENV_VERBOSE, "yes"),
        ]));

        assert_eq!(
            config,
            ArrayConfig::default()
                .with_strategy(Strategy::PrimeFactor)
                .with_threshold(0.75)
                .with_bias(Bias::Leading)
                .with_verbose(true)
        );
    }

    #[test]
    fn test_unparsable_environment_keeps_defaults() {
        let config = ArrayConfig::from_lookup(lookup(&[
            (ENV_STRATEGY, "annealing"),
            (ENV_THRESHOLD, "high"),
            (ENV_VERBOSE, "no"),
        ]));

        assert_eq!(config, ArrayConfig::default());
    }

    #[test]
    fn test_config_round_trips_through_a_file() {
        let path = std::env::temp_dir().join(format!("dalec-config-{}.json", std::process::id()));
        let config = ArrayConfig::default()
            .with_strategy(Strategy::Relaxed)
            .with_threshold(0.5);

        config.save(&path).unwrap();
        let loaded = ArrayConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_take_their_default() {
        let config: ArrayConfig = serde_json::from_str(r#"{ "strategy": "exhaustive" }"#).unwrap();

        assert_eq!(config, ArrayConfig::default().with_strategy(Strategy::Exhaustive));
    }
}
