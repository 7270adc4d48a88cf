use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;

pub const DEFAULT_PLACER_BUDGET: u64 = 50_000;
pub const DEFAULT_IMPROVER_ITERATIONS: usize = 100;
pub const DEFAULT_TABU_ITERATIONS: usize = 200;
pub const DEFAULT_TABU_TENURE: usize = 10;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Iteration ceilings and randomisation for one generation run.
///
/// Every field is optional in JSON; missing fields fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    /// Recursive calls the backtracking placer may make.
    pub placer_budget: u64,
    pub improver_iterations: usize,
    pub tabu_iterations: usize,
    /// Number of recent fingerprints the tabu optimizer refuses to revisit.
    pub tabu_tenure: usize,
    /// Fixed seed for reproducible runs. A random one is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            placer_budget: DEFAULT_PLACER_BUDGET,
            improver_iterations: DEFAULT_IMPROVER_ITERATIONS,
            tabu_iterations: DEFAULT_TABU_ITERATIONS,
            tabu_tenure: DEFAULT_TABU_TENURE,
            seed: None,
        }
    }
}

impl GenerationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_placer_budget(mut self, budget: u64) -> Self {
        self.placer_budget = budget;
        self
    }
}

/// Settings for the HTTP front, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// Reads `SCHEDULER_ADDR`, falling back to the loopback default.
    pub fn from_env() -> Result<Self, String> {
        let raw = env::var("SCHEDULER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let addr = raw
            .parse()
            .map_err(|e| format!("invalid SCHEDULER_ADDR '{}': {}", raw, e))?;
        Ok(Self { addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_budget_keeps_defaults() {
        let config: GenerationConfig = serde_json::from_str(r#"{"tabuIterations": 5}"#).unwrap();
        assert_eq!(config.tabu_iterations, 5);
        assert_eq!(config.placer_budget, DEFAULT_PLACER_BUDGET);
        assert_eq!(config.tabu_tenure, DEFAULT_TABU_TENURE);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn empty_budget_is_default() {
        let config: GenerationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GenerationConfig::default());
    }
}
