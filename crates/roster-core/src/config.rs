//! Application settings, read from an optional `roster.toml` file layered
//! under `ROSTER_`-prefixed environment variables.

use serde::Deserialize;

fn default_db_path() -> String { "roster.db".to_owned() }

fn default_policy_model() -> String { "policy/model.conf".to_owned() }

fn default_policy_rules() -> String { "policy/policy.csv".to_owned() }

fn default_cache_ttl_secs() -> u64 { 60 }

/// Settings of the app.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// Path of the SQLite database file.
  #[serde(default = "default_db_path")]
  pub db_path:        String,
  /// Optional table-name prefix when the schema is namespaced (e.g.
  /// `"roster_"`). Empty means unprefixed.
  #[serde(default)]
  pub db_prefix:      String,
  /// Path of the policy-engine model definition.
  #[serde(default = "default_policy_model")]
  pub policy_model:   String,
  /// Path of the policy rule file.
  #[serde(default = "default_policy_rules")]
  pub policy_rules:   String,
  /// How long permission-check results may be served from cache.
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs: u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      db_path:        default_db_path(),
      db_prefix:      String::new(),
      policy_model:   default_policy_model(),
      policy_rules:   default_policy_rules(),
      cache_ttl_secs: default_cache_ttl_secs(),
    }
  }
}

impl Settings {
  /// Load settings; missing file and missing variables fall back to the
  /// defaults above.
  pub fn load() -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::with_name("roster").required(false))
      .add_source(config::Environment::with_prefix("ROSTER"))
      .build()?
      .try_deserialize()
  }
}
