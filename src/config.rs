//! Environment-driven configuration.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bridge configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Application id the connector authenticates as.
    pub app_id: String,
    /// Application password for the connector's token exchange.
    pub app_password: SecretString,
    /// Route the inbound webhook listens on.
    pub route: String,
    /// Port the webhook server binds to.
    pub port: u16,
    /// The bot's invocation name, as users type it.
    pub bot_name: String,
    /// Whether per-user authorization is enforced.
    pub enable_auth: bool,
    /// Seed list of authorized admin object ids (required when
    /// `enable_auth` is set).
    pub admin_object_ids: Vec<String>,
    /// Tenants allowed to reach the bot. Empty means no filtering.
    pub tenant_allowlist: Vec<String>,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// Missing or inconsistent required values are fatal: the caller
    /// is expected to abort startup on any `ConfigError`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let app_id = require(&get, "BOTBRIDGE_APP_ID")?;
        let app_password = SecretString::from(require(&get, "BOTBRIDGE_APP_PASSWORD")?);

        let route = get("BOTBRIDGE_ROUTE").unwrap_or_else(|| "/api/messages".to_string());
        let port = match get("BOTBRIDGE_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "BOTBRIDGE_PORT".into(),
                message: format!("not a port number: {raw}"),
            })?,
            None => 8080,
        };
        let bot_name = get("BOTBRIDGE_BOT_NAME").unwrap_or_else(|| "bot".to_string());

        let enable_auth = match get("BOTBRIDGE_ENABLE_AUTH") {
            Some(raw) => match raw.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "BOTBRIDGE_ENABLE_AUTH".into(),
                        message: format!("expected a boolean, got {other}"),
                    });
                }
            },
            None => false,
        };

        let admin_object_ids = comma_list(&get("BOTBRIDGE_ADMINS").unwrap_or_default());
        if enable_auth && admin_object_ids.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "BOTBRIDGE_ADMINS".into(),
                hint: "authorization is enabled but no admin object ids are configured".into(),
            });
        }

        let tenant_allowlist = comma_list(&get("BOTBRIDGE_TENANT_ALLOWLIST").unwrap_or_default());

        Ok(Self {
            app_id,
            app_password,
            route,
            port,
            bot_name,
            enable_auth,
            admin_object_ids,
            tenant_allowlist,
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    match get(key) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

/// Split a comma-separated env value into trimmed, non-empty entries.
fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars = vars(pairs);
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn minimal_config_defaults() {
        let settings = load(&[
            ("BOTBRIDGE_APP_ID", "app"),
            ("BOTBRIDGE_APP_PASSWORD", "secret"),
        ])
        .unwrap();
        assert_eq!(settings.route, "/api/messages");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.bot_name, "bot");
        assert!(!settings.enable_auth);
        assert!(settings.tenant_allowlist.is_empty());
    }

    #[test]
    fn missing_credentials_are_fatal() {
        let err = load(&[("BOTBRIDGE_APP_ID", "app")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "BOTBRIDGE_APP_PASSWORD"));
    }

    #[test]
    fn auth_without_admin_seed_is_fatal() {
        let err = load(&[
            ("BOTBRIDGE_APP_ID", "app"),
            ("BOTBRIDGE_APP_PASSWORD", "secret"),
            ("BOTBRIDGE_ENABLE_AUTH", "true"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { key, .. } if key == "BOTBRIDGE_ADMINS"));
    }

    #[test]
    fn admin_and_tenant_lists_parse() {
        let settings = load(&[
            ("BOTBRIDGE_APP_ID", "app"),
            ("BOTBRIDGE_APP_PASSWORD", "secret"),
            ("BOTBRIDGE_ENABLE_AUTH", "1"),
            ("BOTBRIDGE_ADMINS", "obj1, obj2"),
            ("BOTBRIDGE_TENANT_ALLOWLIST", "t1"),
        ])
        .unwrap();
        assert!(settings.enable_auth);
        assert_eq!(settings.admin_object_ids, vec!["obj1", "obj2"]);
        assert_eq!(settings.tenant_allowlist, vec!["t1"]);
    }

    #[test]
    fn comma_list_trims_and_drops_empties() {
        assert_eq!(
            comma_list(" a, b ,,c "),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(comma_list("").is_empty());
        assert!(comma_list(" , ").is_empty());
    }
}
