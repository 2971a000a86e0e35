use std::env;

use chrono_tz::Tz;
use tracing::warn;

pub const DEFAULT_SERVICE_TIMEZONE: Tz = chrono_tz::Asia::Manila;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_token: String,
    pub service_timezone: Tz,
    pub bind_address: String,
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
            supabase_service_token: env::var("SUPABASE_SERVICE_TOKEN")
                .unwrap_or_default(),
            service_timezone: env::var("SERVICE_TIMEZONE")
                .ok()
                .map(|raw| parse_timezone(&raw))
                .unwrap_or(DEFAULT_SERVICE_TIMEZONE),
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - scheduling data will be kept in memory");
        }

        config
    }

    /// Configuration for tests and local runs: no backing database, service zone Asia/Manila.
    pub fn in_memory() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_token: String::new(),
            service_timezone: DEFAULT_SERVICE_TIMEZONE,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_timezone(raw: &str) -> Tz {
    raw.parse::<Tz>().unwrap_or_else(|_| {
        warn!("SERVICE_TIMEZONE '{}' is not a valid IANA zone, using {}", raw, DEFAULT_SERVICE_TIMEZONE);
        DEFAULT_SERVICE_TIMEZONE
    })
}
