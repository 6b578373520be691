use std::env;

use tracing::warn;

use crate::config;

/// Environment variable locating the media library; wins over the config.
pub const MEDIALIB_PATH_VAR: &str = "MEDIALIB_PATH";

pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                warn!("invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent syncing.
            warn!("failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}

pub fn medialib_address(settings: &config::Settings) -> Option<String> {
    pick_address(env::var(MEDIALIB_PATH_VAR).ok(), settings.medialib.address.as_deref())
}

pub(super) fn pick_address(from_env: Option<String>, configured: Option<&str>) -> Option<String> {
    from_env
        .filter(|a| !a.is_empty())
        .or_else(|| configured.filter(|a| !a.is_empty()).map(str::to_string))
}
