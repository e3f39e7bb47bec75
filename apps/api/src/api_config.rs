use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use bastion_application::TokenPolicy;
use bastion_core::{AppError, AppResult};
use bastion_domain::AttemptPolicy;
use bastion_infrastructure::MIN_SIGNING_SECRET_BYTES;
use chrono::TimeDelta;
use tracing_subscriber::EnvFilter;

/// Signing key and the policies built from it.
#[derive(Debug, Clone)]
pub struct SecuritySettings {
    pub signing_secret: String,
    pub token_policy: TokenPolicy,
    pub attempt_policy: AttemptPolicy,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    /// `None` disables the in-process janitor.
    pub janitor_interval: Option<Duration>,
    /// Take the caller address from `x-forwarded-for` instead of the socket.
    pub trust_forwarded_for: bool,
    pub security: SecuritySettings,
}

impl ApiConfig {
    pub fn load() -> AppResult<Self> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    pub fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let variables = Variables { lookup };

        let database_url = variables.optional_non_empty("DATABASE_URL");
        let redis_url = variables.optional_non_empty("REDIS_URL");
        if migrate_only && database_url.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }

        let api_host = variables
            .optional_non_empty("API_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = variables.parse("API_PORT", 3001_u16)?;
        let janitor_seconds = variables.parse("JANITOR_INTERVAL_SECONDS", 300_u64)?;
        let janitor_interval = (janitor_seconds > 0).then(|| Duration::from_secs(janitor_seconds));
        let trust_forwarded_for = variables.flag("API_TRUST_FORWARDED_FOR", false)?;

        let security = if migrate_only {
            SecuritySettings {
                signing_secret: String::new(),
                token_policy: TokenPolicy::default(),
                attempt_policy: AttemptPolicy::default(),
            }
        } else {
            load_security_settings(&variables)?
        };

        Ok(Self {
            migrate_only,
            database_url,
            redis_url,
            api_host,
            api_port,
            janitor_interval,
            trust_forwarded_for,
            security,
        })
    }

    pub fn socket_address(&self) -> AppResult<SocketAddr> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

fn load_security_settings<F>(variables: &Variables<F>) -> AppResult<SecuritySettings>
where
    F: Fn(&str) -> Option<String>,
{
    let signing_secret = variables.required_non_empty("TOKEN_SIGNING_SECRET")?;
    if signing_secret.len() < MIN_SIGNING_SECRET_BYTES {
        return Err(AppError::Validation(format!(
            "TOKEN_SIGNING_SECRET must be at least {MIN_SIGNING_SECRET_BYTES} characters"
        )));
    }

    let token_policy = TokenPolicy {
        issuer: variables
            .optional_non_empty("TOKEN_ISSUER")
            .unwrap_or_else(|| TokenPolicy::DEFAULT_ISSUER.to_owned()),
        ttl: variables.seconds("TOKEN_TTL_SECONDS", TokenPolicy::DEFAULT_TTL_SECONDS)?,
        refresh_grace: variables.seconds(
            "TOKEN_REFRESH_GRACE_SECONDS",
            TokenPolicy::DEFAULT_REFRESH_GRACE_SECONDS,
        )?,
        revoke_on_refresh: variables.flag("TOKEN_REVOKE_ON_REFRESH", true)?,
        count_revoked_as_failure: variables.flag("GUARD_COUNT_REVOKED_AS_FAILURE", false)?,
    };
    token_policy.validate()?;

    let attempt_policy = AttemptPolicy::new(
        variables.parse(
            "GUARD_FAILURE_THRESHOLD",
            AttemptPolicy::DEFAULT_FAILURE_THRESHOLD,
        )?,
        variables.seconds(
            "GUARD_BLOCK_SECONDS",
            AttemptPolicy::DEFAULT_BLOCK_SECONDS,
        )?,
    )?;

    Ok(SecuritySettings {
        signing_secret,
        token_policy,
        attempt_policy,
    })
}

struct Variables<F> {
    lookup: F,
}

impl<F> Variables<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional_non_empty(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required_non_empty(&self, name: &str) -> AppResult<String> {
        let value = (self.lookup)(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{name} must not be empty")));
        }

        Ok(value)
    }

    fn parse<T>(&self, name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional_non_empty(name) {
            Some(value) => value.parse::<T>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }

    fn seconds(&self, name: &str, default: i64) -> AppResult<TimeDelta> {
        let seconds = self.parse(name, default)?;
        TimeDelta::try_seconds(seconds)
            .ok_or_else(|| AppError::Validation(format!("{name} is out of range")))
    }

    fn flag(&self, name: &str, default: bool) -> AppResult<bool> {
        match self.optional_non_empty(name) {
            Some(value) if value.eq_ignore_ascii_case("true") || value == "1" => Ok(true),
            Some(value) if value.eq_ignore_ascii_case("false") || value == "0" => Ok(false),
            Some(value) => Err(AppError::Validation(format!(
                "invalid {name} value '{value}': expected true or false"
            ))),
            None => Ok(default),
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use bastion_core::AppError;
    use chrono::TimeDelta;

    use super::ApiConfig;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, AppError> {
        let variables: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ApiConfig::from_lookup(false, |name| variables.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = load(&[("TOKEN_SIGNING_SECRET", SECRET)]).unwrap_or_else(|_| unreachable!());

        assert_eq!(config.database_url, None);
        assert_eq!(config.api_port, 3001);
        assert!(!config.trust_forwarded_for);
        assert_eq!(config.janitor_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.security.token_policy.ttl, TimeDelta::hours(1));
        assert!(config.security.token_policy.revoke_on_refresh);
        assert_eq!(config.security.attempt_policy.failure_threshold(), 3);
        assert_eq!(
            config.security.attempt_policy.block_duration(),
            TimeDelta::minutes(15)
        );
    }

    #[test]
    fn missing_or_short_secret_is_rejected() {
        assert!(matches!(load(&[]), Err(AppError::Validation(_))));
        assert!(matches!(
            load(&[("TOKEN_SIGNING_SECRET", "short")]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("TOKEN_SIGNING_SECRET", SECRET),
            ("TOKEN_TTL_SECONDS", "120"),
            ("TOKEN_REVOKE_ON_REFRESH", "false"),
            ("GUARD_FAILURE_THRESHOLD", "5"),
            ("GUARD_BLOCK_SECONDS", "60"),
            ("JANITOR_INTERVAL_SECONDS", "0"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("API_TRUST_FORWARDED_FOR", "true"),
        ])
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(config.security.token_policy.ttl, TimeDelta::minutes(2));
        assert!(!config.security.token_policy.revoke_on_refresh);
        assert_eq!(config.security.attempt_policy.failure_threshold(), 5);
        assert_eq!(config.janitor_interval, None);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert!(config.trust_forwarded_for);
    }

    #[test]
    fn durations_beyond_a_year_are_rejected() {
        for name in [
            "TOKEN_TTL_SECONDS",
            "TOKEN_REFRESH_GRACE_SECONDS",
            "GUARD_BLOCK_SECONDS",
        ] {
            let error = load(&[(name, "9000000000000000"), ("TOKEN_SIGNING_SECRET", SECRET)]);
            assert!(matches!(error, Err(AppError::Validation(_))), "{name}");
        }
    }

    #[test]
    fn invalid_numbers_and_flags_are_reported() {
        let error = load(&[
            ("TOKEN_SIGNING_SECRET", SECRET),
            ("GUARD_FAILURE_THRESHOLD", "three"),
        ]);
        let message = match error {
            Err(AppError::Validation(message)) => message,
            _ => String::new(),
        };
        assert!(message.contains("GUARD_FAILURE_THRESHOLD"));

        let error = load(&[
            ("TOKEN_SIGNING_SECRET", SECRET),
            ("TOKEN_REVOKE_ON_REFRESH", "maybe"),
        ]);
        assert!(matches!(error, Err(AppError::Validation(_))));

        let error = load(&[
            ("TOKEN_SIGNING_SECRET", SECRET),
            ("GUARD_FAILURE_THRESHOLD", "0"),
        ]);
        assert!(matches!(error, Err(AppError::Validation(_))));
    }

    #[test]
    fn migrate_mode_needs_only_a_database() {
        let config = ApiConfig::from_lookup(true, |name| {
            (name == "DATABASE_URL").then(|| "postgres://localhost/bastion".to_owned())
        });
        assert!(config.is_ok());
        assert!(ApiConfig::from_lookup(true, |_| None).is_err());
    }
}
