use std::env;
use tracing::warn;

/// Forward window used by the slot listing when the caller gives none.
pub const DEFAULT_SLOT_WINDOW_DAYS: i64 = 14;
pub const DEFAULT_MAX_SLOT_WINDOW_DAYS: i64 = 90;
pub const DEFAULT_API_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub slot_window_days: i64,
    pub max_slot_window_days: i64,
    pub api_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            slot_window_days: parse_or_default("SLOT_WINDOW_DAYS", DEFAULT_SLOT_WINDOW_DAYS),
            max_slot_window_days: parse_or_default("MAX_SLOT_WINDOW_DAYS", DEFAULT_MAX_SLOT_WINDOW_DAYS),
            api_port: parse_or_default("API_PORT", DEFAULT_API_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.slot_window_days > config.max_slot_window_days {
            warn!(
                "SLOT_WINDOW_DAYS ({}) exceeds MAX_SLOT_WINDOW_DAYS ({})",
                config.slot_window_days, config.max_slot_window_days
            );
        }

        config
    }

    /// Config pointing at a single Supabase instance with default scheduling values.
    pub fn for_supabase(url: &str, anon_key: &str, jwt_secret: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            supabase_anon_key: anon_key.to_string(),
            supabase_jwt_secret: jwt_secret.to_string(),
            slot_window_days: DEFAULT_SLOT_WINDOW_DAYS,
            max_slot_window_days: DEFAULT_MAX_SLOT_WINDOW_DAYS,
            api_port: DEFAULT_API_PORT,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
