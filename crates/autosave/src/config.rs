use autosave_core::Result;
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the auto-save scheduler.
///
/// Usually embedded in the host editor's own settings. All fields use
/// sensible defaults if not specified. The save-target redirection is code,
/// not data, and is passed to
/// [`SchedulerBuilder::redirect`](crate::scheduler::SchedulerBuilder::redirect)
/// instead.
///
/// # Defaults
///
/// - `enabled`: `true`
/// - `interval_secs`: `5.0`
///
/// # Examples
///
/// ```
/// use autosave::config::AutosaveConfig;
/// use std::time::Duration;
///
/// let config = AutosaveConfig::from_json(r#"{ "interval_secs": 1.5 }"#).unwrap();
///
/// assert!(config.enabled);
/// assert_eq!(config.interval(), Duration::from_millis(1500));
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AutosaveConfig {
    /// Global switch; when false, `activate` attaches nothing
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quiescence interval after the last edit, in seconds
    #[serde(
        default = "default_interval_secs",
        deserialize_with = "deserialize_interval_secs"
    )]
    pub interval_secs: f64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
        }
    }
}

impl AutosaveConfig {
    /// Parses a configuration from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Quiescence interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(validate_interval_secs(self.interval_secs))
    }
}

const fn default_true() -> bool {
    true
}

const fn default_interval_secs() -> f64 {
    5.0
}

/// Upper bound for `interval_secs` (one day)
pub const MAX_INTERVAL_SECS: f64 = 86_400.0;

/// Replaces unusable intervals so `Duration::from_secs_f64` cannot panic
fn validate_interval_secs(secs: f64) -> f64 {
    if !secs.is_finite() || secs < 0.0 {
        tracing::warn!(
            "interval_secs must be a non-negative number, got {}; using default {}",
            secs,
            default_interval_secs()
        );
        default_interval_secs()
    } else if secs > MAX_INTERVAL_SECS {
        tracing::warn!(
            "interval_secs exceeded max of {}, clamping from {}",
            MAX_INTERVAL_SECS,
            secs
        );
        MAX_INTERVAL_SECS
    } else {
        secs
    }
}

/// Clamps an interval set in code to `MAX_INTERVAL_SECS`.
pub(crate) fn clamp_interval(interval: Duration) -> Duration {
    let max = Duration::from_secs_f64(MAX_INTERVAL_SECS);
    if interval > max {
        tracing::warn!(
            "interval exceeded max of {:?}, clamping from {:?}",
            max,
            interval
        );
        max
    } else {
        interval
    }
}

/// Custom deserializer for interval_secs that validates the range
fn deserialize_interval_secs<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Ok(validate_interval_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AutosaveConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval_secs, 5.0);
        assert_eq!(config.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_full_config_deserialization() {
        let json = r#"{
            "enabled": false,
            "interval_secs": 30
        }"#;

        let config: AutosaveConfig = serde_json::from_str(json).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_config_deserialization() {
        let config = AutosaveConfig::from_json(r#"{ "enabled": false }"#).unwrap();
        assert!(!config.enabled);
        // Other fields should use defaults
        assert_eq!(config.interval_secs, 5.0);
    }

    #[test]
    fn test_empty_config_deserialization() {
        let config = AutosaveConfig::from_json("{}").unwrap();
        assert_eq!(config, AutosaveConfig::default());
    }

    #[test]
    fn test_fractional_interval() {
        let config = AutosaveConfig::from_json(r#"{ "interval_secs": 0.25 }"#).unwrap();
        assert_eq!(config.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_interval_allowed() {
        let config = AutosaveConfig::from_json(r#"{ "interval_secs": 0 }"#).unwrap();
        assert_eq!(config.interval(), Duration::ZERO);
    }

    #[test]
    fn test_negative_interval_falls_back_to_default() {
        let config = AutosaveConfig::from_json(r#"{ "interval_secs": -3 }"#).unwrap();
        assert_eq!(config.interval_secs, 5.0);
    }

    #[test]
    fn test_interval_clamped_to_max() {
        let config = AutosaveConfig::from_json(r#"{ "interval_secs": 1e9 }"#).unwrap();
        assert_eq!(config.interval_secs, MAX_INTERVAL_SECS);
        assert_eq!(config.interval(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_interval_set_in_code_is_validated() {
        let config = AutosaveConfig {
            enabled: true,
            interval_secs: f64::NAN,
        };
        assert_eq!(config.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_clamp_interval() {
        assert_eq!(clamp_interval(Duration::from_secs(3)), Duration::from_secs(3));
        assert_eq!(clamp_interval(Duration::MAX), Duration::from_secs(86_400));
    }

    #[test]
    fn test_invalid_json() {
        let err = AutosaveConfig::from_json(r#"{ "interval_secs": "soon" }"#).unwrap_err();
        assert!(err.to_string().starts_with("JSON error"));
    }
}
