use std::{env, sync::Arc, time::Duration};

use crate::config::Config;

pub trait ConfigService: Send + Sync {
    fn port(&self) -> u16;
    fn values(&self) -> &Config;
}

pub struct ConfigServiceImpl {
    config: Arc<Config>,
}

impl ConfigServiceImpl {
    fn env_nonempty(key: &str) -> Option<String> {
        env::var(key).ok().and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn env_u16(key: &str) -> Option<u16> {
        Self::env_nonempty(key).and_then(|value| value.parse::<u16>().ok())
    }

    fn env_u64(key: &str) -> Option<u64> {
        Self::env_nonempty(key).and_then(|value| value.parse::<u64>().ok())
    }

    fn env_usize(key: &str) -> Option<usize> {
        Self::env_nonempty(key).and_then(|value| value.parse::<usize>().ok())
    }

    pub fn new() -> Self {
        let port = Self::env_u16("PORT").unwrap_or(8000);
        let probe_url = Self::env_nonempty("PROBE_URL")
            .unwrap_or_else(|| "https://api.ipify.org".to_string());
        let probe_timeout =
            Duration::from_secs(Self::env_u64("PROBE_TIMEOUT_SECS").unwrap_or(10));
        let check_concurrency = Self::env_usize("PROXY_CHECK_CONCURRENCY")
            .unwrap_or(8)
            .max(1);

        Self {
            config: Arc::new(Config {
                port,
                probe_url,
                probe_timeout,
                check_concurrency,
            }),
        }
    }
}

impl Default for ConfigServiceImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService for ConfigServiceImpl {
    fn port(&self) -> u16 {
        self.config.port
    }

    fn values(&self) -> &Config {
        &self.config
    }
}
