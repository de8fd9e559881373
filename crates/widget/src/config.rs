use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "THREADVIEW_";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub live: LiveSettings,
    pub storage: StorageSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct LiveSettings {
    pub enabled: bool,
    pub path: String,
    /// 0 disables reconnecting after the push channel drops.
    pub reconnect_delay_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct StorageSettings {
    pub image_base_url: String,
    pub file_base_url: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let env_map = map_env_vars(std::env::vars());

        let s = config::Config::builder()
            .set_default("api.base_url", "http://127.0.0.1:8000")?
            .set_default("api.timeout_secs", 10)?
            .set_default("live.enabled", true)?
            .set_default("live.path", "/ws/chat/")?
            .set_default("live.reconnect_delay_secs", 1)?
            .set_default(
                "storage.image_base_url",
                "https://res.cloudinary.com/demo/image/upload/",
            )?
            .set_default(
                "storage.file_base_url",
                "https://res.cloudinary.com/demo/raw/upload/",
            )?
            .add_source(config::File::with_name("threadview").required(false))
            .add_source(config::File::with_name(&format!("threadview.{}", run_mode)).required(false))
            .add_source(config::File::from_str(
                &serde_json::to_string(&env_map)
                    .map_err(|e| ConfigError::Message(e.to_string()))?,
                config::FileFormat::Json,
            ))
            .build()?;

        s.try_deserialize()
    }
}

/// `THREADVIEW_API__BASE_URL=...` becomes `api.base_url`. The result is fed
/// back to `config` as a flat JSON document of dotted keys.
fn map_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
