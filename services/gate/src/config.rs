use crate::infra::captcha::CaptchaProvider;

/// Gate service configuration loaded from environment variables.
#[derive(Debug)]
pub struct GateConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// Public base URL used when building emailed links (e.g. "https://example.com").
    pub site_base_url: String,
    /// CMS internal account API base URL. Env var: `GATEWAY_URL`.
    pub gateway_url: String,
    /// Mailer service base URL. Env var: `MAILER_URL`.
    pub mailer_url: String,
    /// Comma-separated admin recipient emails. Env var: `ADMIN_EMAILS`.
    pub admin_emails: Vec<String>,
    /// Whether CAPTCHA verification is enforced. Env var: `CAPTCHA_ENABLED`.
    pub captcha_enabled: bool,
    /// One of "recaptcha_v2", "recaptcha_v3", "hcaptcha". Env var: `CAPTCHA_PROVIDER`.
    pub captcha_provider: CaptchaProvider,
    /// Provider secret key. Env var: `CAPTCHA_SECRET`.
    pub captcha_secret: String,
    /// Minimum accepted reCAPTCHA v3 score (default 0.5). Env var: `CAPTCHA_MIN_SCORE`.
    pub captcha_min_score: f64,
    /// Cookie domain attribute for session and nonce cookies.
    pub cookie_domain: String,
    /// Session cookie lifetime in minutes (default 1440). Env var: `SESSION_TIMEOUT_MINUTES`.
    pub session_timeout_minutes: i64,
    /// TCP port to listen on (default 3160). Env var: `GATE_PORT`.
    pub gate_port: u16,
}

impl GateConfig {
    pub fn from_env() -> Self {
        let captcha_enabled = std::env::var("CAPTCHA_ENABLED")
            .ok()
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let captcha_provider = std::env::var("CAPTCHA_PROVIDER")
            .ok()
            .as_deref()
            .map(|v| CaptchaProvider::from_str(v).expect("unknown CAPTCHA_PROVIDER"))
            .unwrap_or(CaptchaProvider::RecaptchaV3);
        let captcha_secret = if captcha_enabled {
            std::env::var("CAPTCHA_SECRET").expect("CAPTCHA_SECRET")
        } else {
            String::new()
        };
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            redis_url: std::env::var("REDIS_URL").expect("REDIS_URL"),
            site_base_url: std::env::var("SITE_BASE_URL").expect("SITE_BASE_URL"),
            gateway_url: std::env::var("GATEWAY_URL").expect("GATEWAY_URL"),
            mailer_url: std::env::var("MAILER_URL").expect("MAILER_URL"),
            admin_emails: std::env::var("ADMIN_EMAILS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_ascii_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            captcha_enabled,
            captcha_provider,
            captcha_secret,
            captcha_min_score: std::env::var("CAPTCHA_MIN_SCORE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.5),
            cookie_domain: std::env::var("COOKIE_DOMAIN").expect("COOKIE_DOMAIN"),
            session_timeout_minutes: std::env::var("SESSION_TIMEOUT_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1440),
            gate_port: std::env::var("GATE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3160),
        }
    }
}
