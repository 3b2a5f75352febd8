use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - At least one shift, with unique non-empty labels and non-empty directives
/// - Task timeout, when set, is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Shift validation
    if config.shifts.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one shift is required".to_string(),
        ));
    }
    let mut labels = HashSet::new();
    for (i, shift) in config.shifts.iter().enumerate() {
        if shift.label.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "shifts[{}].label cannot be empty",
                i
            )));
        }
        if shift.directive.as_str().trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "shifts[{}].directive cannot be empty",
                i
            )));
        }
        if !labels.insert(&shift.label) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate shift label: {}",
                shift.label
            )));
        }
    }

    // Orchestrator validation
    if config.orchestrator.task_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "orchestrator.task_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::TaskParam;
    use crate::orchestrator::OrchestratorConfig;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_no_shifts_fails() {
        let config = Config {
            shifts: vec![],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_shift_label_fails() {
        let config = Config {
            shifts: vec![
                TaskParam::new("+10 years", "older"),
                TaskParam::new("+10 years", "much older"),
            ],
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate shift label"));
    }

    #[test]
    fn test_validate_empty_directive_fails() {
        let config = Config {
            shifts: vec![TaskParam::new("+10 years", "  ")],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let config = Config {
            orchestrator: OrchestratorConfig {
                task_timeout_secs: Some(0),
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
