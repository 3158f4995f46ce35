//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the configuration key in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_plain_value_is_unchanged() {
        assert_eq!(expand_env("127.0.0.1", "server.host").unwrap(), "127.0.0.1");
    }

    #[test]
    fn test_default_is_used_when_unset() {
        let value = expand_env("${WEFT_TEST_SURELY_UNSET:-0.0.0.0}", "server.host").unwrap();

        assert_eq!(value, "0.0.0.0");
    }

    #[test]
    fn test_unset_variable_is_error() {
        let err = expand_env("${WEFT_TEST_SURELY_UNSET}", "server.host").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Environment variable error in server.host: ${WEFT_TEST_SURELY_UNSET} not set"
        );
    }
}
