use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::migrate::migrate;
use crate::store::{read_config, write_config, LoadError, SaveError};

/// Interval between autosave ticks.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config document already loaded")]
    AlreadyLoaded,
    #[error("no config path set")]
    NoPath,
    #[error("config document not loaded")]
    NotLoaded,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// What happened during [`ConfigManager::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadReport {
    /// The file did not exist; the default document was adopted.
    pub created: bool,
    /// The file existed but could not be parsed; defaults were adopted.
    pub recovered: bool,
    /// Migration repaired the document structure.
    pub migrated: bool,
}

#[derive(Default)]
struct DocState {
    conf: Value,
    dirty: bool,
    loaded: bool,
}

struct Autosave {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Owner of the in-memory configuration document.
///
/// Exactly one instance exists per process; it is constructed in `main` and
/// handed by reference to every subsystem that needs settings. All access to
/// the document goes through [`ConfigManager::acquire`], which serializes
/// readers and writers behind a mutex.
///
/// Usage contract: hold the guard only briefly and never perform file or
/// network I/O while holding it. [`ConfigManager::save`] and the autosave
/// tick own the only guarded-then-I/O sequence; they snapshot the document
/// under the guard and write after releasing it.
pub struct ConfigManager {
    path: Mutex<Option<PathBuf>>,
    state: Arc<Mutex<DocState>>,
    autosave: Mutex<Option<Autosave>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            path: Mutex::new(None),
            state: Arc::new(Mutex::new(DocState::default())),
            autosave: Mutex::new(None),
        }
    }

    /// Records the persistence target. Does not touch the filesystem. Only
    /// valid before [`ConfigManager::load`].
    pub fn set_path(&self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        if self.state.lock().loaded {
            return Err(ConfigError::AlreadyLoaded);
        }
        *self.path.lock() = Some(path.into());
        Ok(())
    }

    /// Loads the document from the configured path, migrating it against
    /// `default`.
    ///
    /// A missing file adopts `default` directly; an unparseable file is
    /// reported and replaced by `default` rather than aborting startup. Any
    /// structural repair is persisted immediately. Read I/O errors other
    /// than not-found propagate to the caller.
    pub fn load(&self, default: Value) -> Result<LoadReport, ConfigError> {
        if self.state.lock().loaded {
            return Err(ConfigError::AlreadyLoaded);
        }
        let path = self.path.lock().clone().ok_or(ConfigError::NoPath)?;

        let mut report = LoadReport::default();
        let mut conf = match read_config(&path) {
            Ok(doc) => doc,
            Err(LoadError::NotFound(_)) => {
                info!("no config file at {}, starting from defaults", path.display());
                report.created = true;
                default.clone()
            }
            Err(LoadError::Parse(err)) => {
                warn!(
                    "config file at {} is corrupt ({err}), falling back to defaults",
                    path.display()
                );
                report.recovered = true;
                default.clone()
            }
            Err(err @ LoadError::Io(_)) => return Err(err.into()),
        };

        report.migrated = migrate(&mut conf, &default);

        {
            let mut state = self.state.lock();
            state.conf = conf;
            state.dirty = false;
            state.loaded = true;
        }

        if report.created || report.recovered || report.migrated {
            self.save()?;
        }
        Ok(report)
    }

    /// Blocks until exclusive access to the document is granted.
    ///
    /// Dropping the returned guard releases access; references obtained
    /// through the guard cannot outlive it, so no caller can observe the
    /// document across a release/acquire boundary. Acquiring again from the
    /// same thread without dropping the first guard deadlocks: the lock is
    /// not re-entrant.
    ///
    /// # Panics
    /// Panics if called before [`ConfigManager::load`].
    pub fn acquire(&self) -> ConfigGuard<'_> {
        let state = self.state.lock();
        assert!(state.loaded, "ConfigManager::acquire called before load");
        ConfigGuard { state }
    }

    /// Starts the background autosave activity with the default interval.
    pub fn enable_autosave(&self) {
        self.enable_autosave_every(AUTOSAVE_INTERVAL);
    }

    /// Starts the background autosave activity.
    ///
    /// On each tick the document is persisted only if it was marked dirty
    /// since the last write; a clean document causes no I/O. A failed write
    /// is logged, the dirty flag is restored and the write retried on the
    /// next tick. Enabling twice is a no-op.
    pub fn enable_autosave_every(&self, interval: Duration) {
        let mut slot = self.autosave.lock();
        if slot.is_some() {
            return;
        }
        let path = match self.path.lock().clone() {
            Some(path) => path,
            None => {
                warn!("autosave enabled before a config path was set");
                return;
            }
        };

        let state = Arc::clone(&self.state);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let thread = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => autosave_tick(&path, &state),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        *slot = Some(Autosave { stop_tx, thread });
    }

    /// Stops the autosave activity, waiting for an in-flight tick to finish
    /// so a later explicit [`ConfigManager::save`] cannot race it.
    pub fn disable_autosave(&self) {
        let running = self.autosave.lock().take();
        if let Some(Autosave { stop_tx, thread }) = running {
            let _ = stop_tx.send(());
            if thread.join().is_err() {
                error!("autosave thread panicked");
            }
        }
    }

    /// Synchronously persists the document, dirty or not, and clears the
    /// dirty flag. On failure the dirty flag is restored so the state is
    /// retried by autosave or a later save.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = self.path.lock().clone().ok_or(ConfigError::NoPath)?;
        let snapshot = {
            let mut state = self.state.lock();
            if !state.loaded {
                return Err(ConfigError::NotLoaded);
            }
            state.dirty = false;
            state.conf.clone()
        };
        if let Err(err) = write_config(&path, &snapshot) {
            self.state.lock().dirty = true;
            return Err(err.into());
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConfigManager {
    fn drop(&mut self) {
        self.disable_autosave();
    }
}

fn autosave_tick(path: &Path, state: &Mutex<DocState>) {
    let snapshot = {
        let mut state = state.lock();
        if !state.dirty {
            return;
        }
        state.dirty = false;
        state.conf.clone()
    };
    if let Err(err) = write_config(path, &snapshot) {
        error!("autosave failed: {err}");
        state.lock().dirty = true;
    }
}

/// Exclusive handle to the configuration document.
///
/// Derefs to the document itself. Mutations become visible to other
/// acquirers when the guard is dropped; nothing is persisted on drop. Call
/// [`ConfigGuard::mark_dirty`] after mutating so the change reaches disk on
/// the next autosave tick or explicit save.
pub struct ConfigGuard<'a> {
    state: MutexGuard<'a, DocState>,
}

impl ConfigGuard<'_> {
    /// Marks the document as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.state.dirty = true;
    }
}

impl Deref for ConfigGuard<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.state.conf
    }
}

impl DerefMut for ConfigGuard<'_> {
    fn deref_mut(&mut self) -> &mut Value {
        &mut self.state.conf
    }
}
