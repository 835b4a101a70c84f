use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_min: u32,
    pub pool_max: u32,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Shared secret the identity provider signs access tokens with.
    pub jwt_secret: String,
    /// Base URL of the identity provider (empty disables the admin client).
    pub identity_url: String,
    pub service_role_key: String,
    pub impersonation_cookie: String,
    pub impersonation_ttl_secs: i64,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub resend_api_key: String,
    pub email_from: String,
    pub app_origin: String,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_or_parse("PORT", 3000),
            environment: env_or("APP_ENV", "development"),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000,http://localhost:8080")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_or_parse("DB_PORT", 5432),
                database: env_or("DB_NAME", "sporthub"),
                user: env_or("DB_USER", "sporthub"),
                password: env_or("DB_PASSWORD", ""),
                pool_min: env_or_parse("DB_POOL_MIN", 5),
                pool_max: env_or_parse("DB_POOL_MAX", 50),
            },
            auth: AuthConfig {
                jwt_secret: env_or("JWT_SECRET", "change-me-to-a-secure-random-string"),
                identity_url: env_or("IDENTITY_URL", ""),
                service_role_key: env_or("IDENTITY_SERVICE_ROLE_KEY", ""),
                impersonation_cookie: env_or("IMPERSONATION_COOKIE", "sporthub_impersonate"),
                impersonation_ttl_secs: parse_duration_to_secs(&env_or(
                    "IMPERSONATION_TTL",
                    "8h",
                )),
            },
            mail: MailConfig {
                resend_api_key: env_or("RESEND_API_KEY", ""),
                email_from: env_or("EMAIL_FROM", ""),
                app_origin: env_or("APP_ORIGIN", "http://localhost:3000"),
            },
            rate_limit: RateLimitConfig {
                window_secs: 60,
                max_requests: env_or_parse("RATE_LIMIT_MAX", 100),
            },
        }
    }

    pub fn database_url(&self) -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db.user, self.db.password, self.db.host, self.db.port, self.db.database
        )
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_duration_to_secs(s: &str) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        return 3600;
    }
    // last() is char-based, so a multibyte trailing unit cannot panic the split
    let Some((idx, unit)) = s.char_indices().last() else {
        return 3600;
    };
    let num: i64 = s[..idx].parse().unwrap_or(1);
    match unit {
        's' => num,
        'm' => num * 60,
        'h' => num * 3600,
        'd' => num * 86400,
        _ => s.parse().unwrap_or(3600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration_to_secs("30s"), 30);
        assert_eq!(parse_duration_to_secs("5m"), 300);
        assert_eq!(parse_duration_to_secs("8h"), 8 * 3600);
        assert_eq!(parse_duration_to_secs("2d"), 2 * 86400);
    }

    #[test]
    fn bare_numbers_and_garbage_fall_back() {
        assert_eq!(parse_duration_to_secs("7200"), 7200);
        assert_eq!(parse_duration_to_secs(""), 3600);
        assert_eq!(parse_duration_to_secs("soon"), 3600);
    }

    #[test]
    fn multibyte_trailing_unit_does_not_panic() {
        assert_eq!(parse_duration_to_secs("8ч"), 3600);
        assert_eq!(parse_duration_to_secs("ч"), 3600);
        assert_eq!(parse_duration_to_secs("5分"), 3600);
    }
}
