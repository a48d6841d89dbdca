use super::model::{Profile, HDR};
use super::set::ProfileSet;
use crate::error::PrepError;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Change notifications emitted by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    Switched { from: String, to: String },
    Updated { name: String },
}

type Listener = Arc<dyn Fn(&ProfileEvent) + Send + Sync>;

/// Options consumed by [`ProfileStore::initialize`]
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Discard user edits and reseed from the built-in defaults
    pub force_reset: bool,
    /// Profile named on the command line
    pub cli_profile: Option<String>,
    /// Profile named in the environment
    pub env_profile: Option<String>,
}

/// Named profiles plus the active selection, backed by a JSON file.
///
/// Readers get owned copies, so a concurrent switch never changes a profile
/// someone is already using. Mutations are serialized on an internal lock
/// that is held across the save. Listeners run under that lock and must not
/// call mutating methods; subscribing from a listener is allowed.
pub struct ProfileStore {
    path: PathBuf,
    state: RwLock<ProfileSet>,
    write_lock: Mutex<()>,
    listeners: RwLock<Vec<Listener>>,
}

impl ProfileStore {
    /// Create a store holding the built-in set; nothing is read until
    /// [`initialize`](Self::initialize).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(ProfileSet::builtin()),
            write_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the built-in defaults hash from the last reseed
    pub fn stamp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".stamp");
        PathBuf::from(name)
    }

    /// Load the user document, reseeding it from the built-in defaults when
    /// it is missing, corrupt, stale (defaults hash changed) or a reset was
    /// requested. Then apply the CLI and environment overrides.
    ///
    /// Returns the resolved active profile name. A save failure is returned
    /// as an error, but the in-memory state is already in place.
    pub fn initialize(&self, options: &InitOptions) -> Result<String, PrepError> {
        let _guard = self.write_lock.lock();

        let builtin = ProfileSet::builtin();
        let builtin_hash = builtin.content_hash()?;
        let stored_hash = std::fs::read_to_string(self.stamp_path())
            .ok()
            .map(|s| s.trim().to_string());
        let user = self.load_user_file();

        let stale = stored_hash.as_deref() != Some(builtin_hash.as_str());
        let (mut set, reseeded) = match user {
            Some(user) if !options.force_reset && !stale => (user, false),
            previous => {
                let mut fresh = builtin;
                if let Some(previous) = previous {
                    if fresh.contains(&previous.active_profile) {
                        fresh.active_profile = previous.active_profile;
                    }
                }
                tracing::info!(
                    "Reseeding profiles from built-in defaults (forced: {}, stale: {})",
                    options.force_reset,
                    stale
                );
                (fresh, true)
            }
        };
        set.ensure_active();

        let before_override = set.active_profile.clone();
        let overrides = [
            ("command line", options.cli_profile.as_deref()),
            ("environment", options.env_profile.as_deref()),
        ];
        for (source, candidate) in overrides {
            let Some(name) = candidate.map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            if set.contains(name) {
                tracing::info!("Using profile {:?} from {}", name, source);
                set.active_profile = name.to_string();
                break;
            }
            tracing::warn!("Ignoring unknown profile {:?} from {}", name, source);
        }
        let overridden = set.active_profile != before_override;

        let active = set.active_profile.clone();
        *self.state.write() = set;

        if reseeded || overridden {
            self.save_locked()?;
        }
        if reseeded {
            std::fs::write(self.stamp_path(), &builtin_hash)
                .map_err(|e| PrepError::profile_io(self.stamp_path(), e))?;
        }

        tracing::info!("Active profile: {}", active);
        Ok(active)
    }

    /// Make `name` active, falling back to HDR when it does not exist.
    ///
    /// Returns the name that is active afterwards. Nothing is saved or
    /// announced when that name was already active.
    pub fn switch(&self, name: &str) -> Result<String, PrepError> {
        let _guard = self.write_lock.lock();

        let (from, to) = {
            let mut state = self.state.write();
            let resolved = if state.contains(name) {
                name.to_string()
            } else {
                tracing::warn!("Unknown profile {:?}, falling back to {}", name, HDR);
                state.ensure_builtins();
                HDR.to_string()
            };

            if state.active_profile == resolved {
                return Ok(resolved);
            }
            let from = std::mem::replace(&mut state.active_profile, resolved.clone());
            (from, resolved)
        };

        tracing::info!("Switched profile {} -> {}", from, to);
        self.notify(&ProfileEvent::Switched {
            from,
            to: to.clone(),
        });
        self.save_locked()?;
        Ok(to)
    }

    /// Look up a profile. Never fails: a missing name is built from the
    /// built-in rules and cached in memory.
    pub fn get(&self, name: &str) -> Profile {
        if let Some(profile) = self.state.read().profiles.get(name) {
            return profile.clone();
        }

        let mut state = self.state.write();
        state.ensure_builtins();
        state
            .profiles
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!("Synthesizing profile {:?} from built-in rules", name);
                Profile::builtin_for(name)
            })
            .clone()
    }

    /// Replace (or add) a profile and persist the set.
    pub fn update(&self, name: &str, profile: Profile) -> Result<(), PrepError> {
        let _guard = self.write_lock.lock();
        let profile = profile.sanitized();

        {
            let mut state = self.state.write();
            if state.profiles.get(name) == Some(&profile) {
                return Ok(());
            }
            state.profiles.insert(name.to_string(), profile);
        }

        tracing::info!("Updated profile {}", name);
        self.notify(&ProfileEvent::Updated {
            name: name.to_string(),
        });
        self.save_locked()
    }

    pub fn all(&self) -> BTreeMap<String, Profile> {
        self.state.read().profiles.clone()
    }

    pub fn active_name(&self) -> String {
        self.state.read().active_profile.clone()
    }

    /// Snapshot of the active profile
    pub fn current(&self) -> Profile {
        let state = self.state.read();
        state
            .active()
            .cloned()
            .unwrap_or_else(|| Profile::builtin_for(&state.active_profile))
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&ProfileEvent) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Listeners are called on a snapshot of the list, so one may subscribe
    /// further listeners; those only see later events.
    fn notify(&self, event: &ProfileEvent) {
        let listeners: Vec<Listener> = self.listeners.read().clone();
        for listener in &listeners {
            listener(event);
        }
    }

    fn load_user_file(&self) -> Option<ProfileSet> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Cannot read {:?}: {}", self.path, e);
                return None;
            }
        };

        match ProfileSet::from_json(&text) {
            Ok(set) => Some(set),
            Err(e) => {
                tracing::warn!("Profile file {:?} is corrupt: {}", self.path, e);
                None
            }
        }
    }

    /// Atomically write the current set. Caller holds `write_lock`.
    fn save_locked(&self) -> Result<(), PrepError> {
        let json = self.state.read().to_json_pretty()?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| PrepError::profile_io(&dir, e))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| PrepError::profile_io(&dir, e))?;
        temp.write_all(json.as_bytes())
            .map_err(|e| PrepError::profile_io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| PrepError::profile_io(&self.path, e.error))?;

        tracing::debug!("Saved profiles to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::model::{BinarizerKind, MorphKernel, SDR};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ProfileStore {
        ProfileStore::new(dir.path().join("profiles.json"))
    }

    #[test]
    fn test_initialize_seeds_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let active = store.initialize(&InitOptions::default()).unwrap();

        assert_eq!(active, HDR);
        assert!(store.path().exists());
        assert!(store.stamp_path().exists());
    }

    #[test]
    fn test_update_round_trips_through_fresh_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize(&InitOptions::default()).unwrap();

        let edited = Profile {
            upscale: 3,
            tone_map_gamma: 1.27,
            hsv_mask: true,
            hsv_sat_color: 0.41,
            binarizer: BinarizerKind::Sauvola,
            sauvola_k: 0.34,
            sauvola_window: 19,
            morph_kernel: MorphKernel::Cross,
            morph_dilate: 2,
            invert: true,
            ..Profile::sdr()
        };
        store.update("Night", edited.clone()).unwrap();

        let reloaded = store_in(&dir);
        reloaded.initialize(&InitOptions::default()).unwrap();
        assert_eq!(reloaded.get("Night"), edited);
    }

    #[test]
    fn test_full_precision_floats_survive_fresh_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize(&InitOptions::default()).unwrap();

        let edited = Profile {
            tone_map_gamma: 1.2345678901234567,
            hsv_sat_color: 0.9856906946328695,
            hsv_val_color: 0.1234567890123456,
            hsv_sat_gray: 0.3141592653589793,
            hsv_val_gray: 0.7071067811865476,
            contrast: 1.4142135623730951,
            gamma: 2.718281828459045,
            adaptive_bias: 37.77777777777778,
            sauvola_k: 0.9856906946328695,
            sauvola_r: 127.93124016538123,
            ..Profile::hdr()
        };
        assert_eq!(edited.clone().sanitized(), edited);

        let mut k = 0.1f64;
        for i in 0..50 {
            // Spread k over (0, 1) with long mantissas
            k = (k * 3.9 * (1.0 - k)).clamp(0.0, 1.0);
            let profile = Profile {
                sauvola_k: k,
                ..edited.clone()
            };
            store.update(&format!("P{}", i), profile).unwrap();
        }
        store.update("Night", edited.clone()).unwrap();

        let reloaded = store_in(&dir);
        reloaded.initialize(&InitOptions::default()).unwrap();
        assert_eq!(reloaded.get("Night"), edited);
        for (name, profile) in store.all() {
            assert_eq!(reloaded.get(&name), profile, "{} changed on reload", name);
        }
    }

    #[test]
    fn test_user_edits_survive_when_defaults_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize(&InitOptions::default()).unwrap();
        store
            .update(
                HDR,
                Profile {
                    adaptive_bias: 14.0,
                    ..Profile::hdr()
                },
            )
            .unwrap();

        let again = store_in(&dir);
        again.initialize(&InitOptions::default()).unwrap();
        assert_eq!(again.get(HDR).adaptive_bias, 14.0);
    }

    #[test]
    fn test_stale_stamp_reseeds_but_keeps_active_name() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize(&InitOptions::default()).unwrap();
        store.switch(SDR).unwrap();
        store
            .update(
                SDR,
                Profile {
                    upscale: 4,
                    ..Profile::sdr()
                },
            )
            .unwrap();
        std::fs::write(store.stamp_path(), "previous-release").unwrap();

        let again = store_in(&dir);
        let active = again.initialize(&InitOptions::default()).unwrap();

        assert_eq!(active, SDR);
        assert_eq!(again.get(SDR), Profile::sdr());
    }

    #[test]
    fn test_force_reset_discards_edits() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize(&InitOptions::default()).unwrap();
        store.update("Custom", Profile::hdr()).unwrap();

        let again = store_in(&dir);
        again
            .initialize(&InitOptions {
                force_reset: true,
                ..Default::default()
            })
            .unwrap();
        assert!(!again.all().contains_key("Custom"));
    }

    #[test]
    fn test_corrupt_file_is_reseeded() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize(&InitOptions::default()).unwrap();
        std::fs::write(store.path(), "{{{ definitely not json").unwrap();

        let again = store_in(&dir);
        let active = again.initialize(&InitOptions::default()).unwrap();

        assert_eq!(active, HDR);
        let text = std::fs::read_to_string(again.path()).unwrap();
        assert!(ProfileSet::from_json(&text).is_ok());
    }

    #[test]
    fn test_overrides_are_validated_in_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let active = store
            .initialize(&InitOptions {
                cli_profile: Some("Bogus".to_string()),
                env_profile: Some(SDR.to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active, SDR);

        let store = store_in(&dir);
        let active = store
            .initialize(&InitOptions {
                cli_profile: Some(HDR.to_string()),
                env_profile: Some(SDR.to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active, HDR);
    }

    #[test]
    fn test_switch_to_unknown_falls_back_to_hdr() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize(&InitOptions::default()).unwrap();
        store.switch(SDR).unwrap();

        let active = store.switch("doesNotExist").unwrap();

        assert_eq!(active, HDR);
        assert_eq!(store.active_name(), HDR);
    }

    #[test]
    fn test_switch_notifies_only_on_change() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize(&InitOptions::default()).unwrap();

        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        store.switch(HDR).unwrap();
        store.switch(SDR).unwrap();
        store.switch(SDR).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![ProfileEvent::Switched {
                from: HDR.to_string(),
                to: SDR.to_string()
            }]
        );
    }

    #[test]
    fn test_listener_can_subscribe_during_notification() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));
        store.initialize(&InitOptions::default()).unwrap();

        let late_calls = Arc::new(StdMutex::new(0));
        let weak = Arc::downgrade(&store);
        let counter = Arc::clone(&late_calls);
        store.subscribe(move |_| {
            if let Some(store) = weak.upgrade() {
                let counter = Arc::clone(&counter);
                store.subscribe(move |_| *counter.lock().unwrap() += 1);
            }
        });

        store.switch(SDR).unwrap();
        assert_eq!(*late_calls.lock().unwrap(), 0);

        store.switch(HDR).unwrap();
        assert_eq!(*late_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_get_synthesizes_missing_profiles() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.get("sdr"), Profile::sdr());
        assert_eq!(store.get("Anything"), Profile::hdr());
        assert!(store.all().contains_key("Anything"));
    }

    #[test]
    fn test_current_is_a_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize(&InitOptions::default()).unwrap();

        let snapshot = store.current();
        store.switch(SDR).unwrap();

        assert_eq!(snapshot, Profile::hdr());
        assert_eq!(store.current(), Profile::sdr());
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let dir = TempDir::new().unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = ProfileStore::new(blocker.join("profiles.json"));

        let result = store.switch(SDR);

        assert!(result.is_err());
        assert_eq!(store.active_name(), SDR);
    }
}
