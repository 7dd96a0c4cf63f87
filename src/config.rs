use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::capture::RecognizerConfig;
use crate::session::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub call: CallConfig,
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub ws_url: String,
    /// 0 disables the timeout
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallConfig {
    pub display_name: String,
    pub from: String,
    pub to: String,
    /// 0 disables keepalive pings
    pub keepalive_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub lang: String,
}

impl Config {
    /// Load defaults, then `path` (optional, any format `config` knows),
    /// then `GOQ__SECTION__KEY` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "goq-client")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8090)?
            .set_default("backend.base_url", "http://localhost:8000")?
            .set_default("backend.ws_url", "ws://localhost:8000")?
            .set_default("backend.request_timeout_secs", 30)?
            .set_default("call.display_name", "Trader")?
            .set_default("call.from", "+1234567890")?
            .set_default("call.to", "+0987654321")?
            .set_default("call.keepalive_secs", 0)?
            .set_default("speech.enabled", true)?
            .set_default("speech.lang", "en-US")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("GOQ").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            display_name: self.call.display_name.clone(),
            from: self.call.from.clone(),
            to: self.call.to.clone(),
            keepalive: (self.call.keepalive_secs > 0)
                .then(|| Duration::from_secs(self.call.keepalive_secs)),
        }
    }

    pub fn recognizer_config(&self) -> RecognizerConfig {
        RecognizerConfig {
            lang: self.speech.lang.clone(),
            ..RecognizerConfig::default()
        }
    }
}
