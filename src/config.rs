use crate::Args;
use gravity_ocr_prep::InitOptions;
use std::path::PathBuf;

/// Environment variable naming the profile to activate at startup
pub const PROFILE_ENV: &str = "GRAVITY_PROFILE";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub profiles_path: PathBuf,
    pub init: InitOptions,
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            profiles_path: args
                .profiles_path
                .clone()
                .unwrap_or_else(default_profiles_path),
            init: InitOptions {
                force_reset: args.reset_profiles,
                cli_profile: args.profile.clone(),
                env_profile: std::env::var(PROFILE_ENV)
                    .ok()
                    .filter(|name| !name.trim().is_empty()),
            },
        }
    }
}

/// `<config dir>/gravity-capture/profiles.json`
pub fn default_profiles_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("gravity-capture")
        .join("profiles.json")
}
