//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] is validated once at engine construction; states
//! read its settings through the context's `config()` hook.

use std::error::Error;
use std::fmt;

use indexmap::IndexMap;

// ── SettingValue ───────────────────────────────────────────────────

/// A typed static setting value readable by states.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value. Must be finite.
    Float(f64),
    /// Text value.
    Text(String),
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The checkpoint retention cap is zero.
    ZeroCheckpointCapacity,
    /// A float setting is NaN or infinite.
    NonFiniteSetting {
        /// The offending setting key.
        key: String,
        /// The non-finite value.
        value: f64,
    },
    /// The state registry has no registered constructors.
    EmptyRegistry,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCheckpointCapacity => {
                write!(f, "max_checkpoints must be at least 1")
            }
            Self::NonFiniteSetting { key, value } => {
                write!(f, "setting '{key}' must be finite, got {value}")
            }
            Self::EmptyRegistry => write!(f, "state registry has no registered states"),
        }
    }
}

impl Error for ConfigError {}

// ── EngineConfig ───────────────────────────────────────────────────

/// Static configuration for an [`Engine`](crate::engine::Engine).
///
/// Settings are opaque to the engine itself; states read them through
/// the context. The engine consumes only the retention cap for its
/// bundled checkpoint store.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Typed key/value settings visible to every state.
    pub settings: IndexMap<String, SettingValue>,
    /// Retention cap for the bundled in-memory checkpoint store.
    /// Default: 32. Minimum: 1.
    pub max_checkpoints: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settings: IndexMap::new(),
            max_checkpoints: 32,
        }
    }
}

impl EngineConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_checkpoints == 0 {
            return Err(ConfigError::ZeroCheckpointCapacity);
        }
        for (key, value) in &self.settings {
            if let SettingValue::Float(v) = value {
                if !v.is_finite() {
                    return Err(ConfigError::NonFiniteSetting {
                        key: key.clone(),
                        value: *v,
                    });
                }
            }
        }
        Ok(())
    }

    /// Insert or replace a setting.
    pub fn set(&mut self, key: impl Into<String>, value: SettingValue) {
        self.settings.insert(key.into(), value);
    }

    /// Read a boolean setting.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.settings.get(key) {
            Some(SettingValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Read an integer setting.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.settings.get(key) {
            Some(SettingValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Read a float setting.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.settings.get(key) {
            Some(SettingValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Read a text setting.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.settings.get(key) {
            Some(SettingValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_checkpoint_capacity_fails() {
        let cfg = EngineConfig {
            max_checkpoints: 0,
            ..EngineConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::ZeroCheckpointCapacity) => {}
            other => panic!("expected ZeroCheckpointCapacity, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_float_setting_fails() {
        let mut cfg = EngineConfig::default();
        cfg.set("field_length", SettingValue::Float(f64::NAN));
        match cfg.validate() {
            Err(ConfigError::NonFiniteSetting { key, .. }) => assert_eq!(key, "field_length"),
            other => panic!("expected NonFiniteSetting, got {other:?}"),
        }
    }

    #[test]
    fn typed_getters_reject_mismatched_types() {
        let mut cfg = EngineConfig::default();
        cfg.set("downs", SettingValue::Int(4));
        cfg.set("overtime", SettingValue::Bool(true));
        cfg.set("home", SettingValue::Text("Red".to_string()));

        assert_eq!(cfg.get_int("downs"), Some(4));
        assert_eq!(cfg.get_bool("overtime"), Some(true));
        assert_eq!(cfg.get_text("home"), Some("Red"));
        assert_eq!(cfg.get_bool("downs"), None);
        assert_eq!(cfg.get_float("missing"), None);
    }
}
