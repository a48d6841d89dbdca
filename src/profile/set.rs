use super::model::{Profile, HDR, SDR};
use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Persisted profile document: `{ "activeProfile": ..., "profiles": {...} }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSet {
    pub active_profile: String,
    pub profiles: BTreeMap<String, Profile>,
}

/// Loose on-disk shape; each profile is overlaid onto its built-in base
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfileSet {
    #[serde(default)]
    active_profile: String,
    #[serde(default)]
    profiles: BTreeMap<String, Value>,
}

impl ProfileSet {
    /// The shipped defaults
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(HDR.to_string(), Profile::hdr());
        profiles.insert(SDR.to_string(), Profile::sdr());
        Self {
            active_profile: HDR.to_string(),
            profiles,
        }
    }

    /// Parse a hand-editable document.
    ///
    /// Keys missing from a profile fall back to that profile's built-in
    /// value. A profile whose values cannot be read at all is replaced by
    /// its built-in form rather than failing the whole document.
    pub fn from_json(text: &str) -> Result<Self, PrepError> {
        let raw: RawProfileSet = serde_json::from_str(text)?;
        let mut profiles = BTreeMap::new();

        for (name, value) in raw.profiles {
            let profile = overlay(&name, value).unwrap_or_else(|e| {
                tracing::warn!("Profile {:?} is malformed ({}), using built-in values", name, e);
                Profile::builtin_for(&name)
            });
            profiles.insert(name, profile.sanitized());
        }

        let mut set = Self {
            active_profile: raw.active_profile,
            profiles,
        };
        set.ensure_active();
        Ok(set)
    }

    pub fn to_json_pretty(&self) -> Result<String, PrepError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 over the compact serialization, lowercase hex
    pub fn content_hash(&self) -> Result<String, PrepError> {
        let canonical = serde_json::to_vec(self)?;
        let digest = Sha256::digest(&canonical);
        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Make sure HDR and SDR are present
    pub fn ensure_builtins(&mut self) {
        for name in [HDR, SDR] {
            self.profiles
                .entry(name.to_string())
                .or_insert_with(|| Profile::builtin_for(name));
        }
    }

    /// Point the active name at an existing entry, falling back to HDR
    pub fn ensure_active(&mut self) {
        if !self.contains(&self.active_profile) {
            if !self.active_profile.is_empty() {
                tracing::warn!(
                    "Active profile {:?} does not exist, falling back to {}",
                    self.active_profile,
                    HDR
                );
            }
            self.active_profile = HDR.to_string();
        }
        self.profiles
            .entry(HDR.to_string())
            .or_insert_with(Profile::hdr);
    }

    pub fn active(&self) -> Option<&Profile> {
        self.profiles.get(&self.active_profile)
    }
}

fn overlay(name: &str, value: Value) -> Result<Profile, serde_json::Error> {
    let mut base = serde_json::to_value(Profile::builtin_for(name))?;
    if let (Value::Object(base_map), Value::Object(user_map)) = (&mut base, value) {
        for (key, v) in user_map {
            if base_map.contains_key(&key) {
                base_map.insert(key, v);
            }
        }
    }
    serde_json::from_value(base)
}
