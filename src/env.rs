//! Environment variable substitution for configuration values
//!
//! This module provides functionality to substitute environment variable
//! references in configuration strings. Variables are referenced using
//! the `${VAR_NAME}` syntax, or `${VAR_NAME:default}` to fall back to a
//! default (possibly empty) value when the variable is not set.

use once_cell::sync::Lazy;
use regex::Regex;
use std::env;

use crate::config::ConfigError;

/// Regex pattern for environment variable references: ${VAR_NAME} or ${VAR_NAME:default}
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").unwrap());

/// Substitute environment variable references in a string.
///
/// Variables are referenced using the `${VAR_NAME}` syntax. A reference may
/// carry a default after a colon (`${VAR_NAME:fallback}`); the default is
/// used when the variable is not set. References without a default that
/// resolve to no variable are collected and reported together.
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing_vars = Vec::new();
    let mut result = input.to_string();

    for caps in ENV_VAR_PATTERN.captures_iter(input) {
        let full_match = caps.get(0).unwrap().as_str();
        let var_name = caps.get(1).unwrap().as_str();
        let default = caps.get(2).map(|m| m.as_str());

        match env::var(var_name) {
            Ok(value) => {
                result = result.replace(full_match, &value);
            }
            Err(_) => match default {
                Some(fallback) => {
                    result = result.replace(full_match, fallback);
                }
                None => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            },
        }
    }

    if !missing_vars.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Missing environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}
