use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use serde_json::json;
use skywave_config::{default_config, read_config, ConfigError, ConfigManager};
use tempfile::TempDir;

const TICK: Duration = Duration::from_millis(25);
const SETTLE: Duration = Duration::from_millis(250);

fn loaded_manager(dir: &TempDir) -> ConfigManager {
    let manager = ConfigManager::new();
    manager.set_path(dir.path().join("config.json")).unwrap();
    manager.load(default_config()).unwrap();
    manager
}

#[test]
fn load_without_file_adopts_defaults_and_persists() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::new();
    let path = dir.path().join("config.json");
    manager.set_path(&path).unwrap();

    let report = manager.load(default_config()).unwrap();
    assert!(report.created);
    assert!(path.exists());

    let conf = manager.acquire();
    assert_eq!(conf["uiScale"], json!(1.0));
}

#[test]
fn load_repairs_missing_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let mut on_disk = default_config();
    on_disk.as_object_mut().unwrap().remove("uiScale");
    fs::write(&path, serde_json::to_vec_pretty(&on_disk).unwrap()).unwrap();

    let manager = ConfigManager::new();
    manager.set_path(&path).unwrap();
    let report = manager.load(default_config()).unwrap();
    assert!(report.migrated);

    let default = default_config();
    let conf = manager.acquire();
    assert_eq!(conf["uiScale"], json!(1.0));
    let keys: Vec<_> = conf.as_object().unwrap().keys().cloned().collect();
    let expected: Vec<_> = default.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), expected.len());
    for key in expected {
        assert!(conf.get(&key).is_some(), "missing {key}");
    }
}

#[test]
fn load_drops_unknown_key_and_persists_repair() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let mut on_disk = default_config();
    on_disk["legacyFoo"] = json!(1);
    fs::write(&path, serde_json::to_vec_pretty(&on_disk).unwrap()).unwrap();

    let manager = ConfigManager::new();
    manager.set_path(&path).unwrap();
    let report = manager.load(default_config()).unwrap();
    assert!(report.migrated);
    assert!(manager.acquire().get("legacyFoo").is_none());

    // The repaired document was written back immediately.
    let on_disk = read_config(&path).unwrap();
    assert!(on_disk.get("legacyFoo").is_none());
}

#[test]
fn corrupt_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ definitely broken").unwrap();

    let manager = ConfigManager::new();
    manager.set_path(&path).unwrap();
    let report = manager.load(default_config()).unwrap();
    assert!(report.recovered);

    let rewritten = read_config(&path).unwrap();
    assert_eq!(rewritten, default_config());
}

#[test]
fn state_machine_rejects_out_of_order_calls() {
    let dir = TempDir::new().unwrap();

    let manager = ConfigManager::new();
    assert!(matches!(
        manager.load(default_config()),
        Err(ConfigError::NoPath)
    ));
    assert!(matches!(manager.save(), Err(ConfigError::NoPath)));

    manager.set_path(dir.path().join("config.json")).unwrap();
    assert!(matches!(manager.save(), Err(ConfigError::NotLoaded)));

    manager.load(default_config()).unwrap();
    assert!(matches!(
        manager.set_path(dir.path().join("elsewhere.json")),
        Err(ConfigError::AlreadyLoaded)
    ));
    assert!(matches!(
        manager.load(default_config()),
        Err(ConfigError::AlreadyLoaded)
    ));
}

#[test]
#[should_panic(expected = "acquire called before load")]
fn acquire_before_load_is_a_fault() {
    let manager = ConfigManager::new();
    let _guard = manager.acquire();
}

#[test]
fn acquire_serializes_concurrent_mutation() {
    let dir = TempDir::new().unwrap();
    let manager = Arc::new(loaded_manager(&dir));
    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let manager = Arc::clone(&manager);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let mut conf = manager.acquire();
            barrier.wait();
            // Two-step mutation; the other thread must never observe only
            // half of it.
            conf["frequency"] = json!(7100000.0);
            thread::sleep(Duration::from_millis(100));
            conf["manualOffset"] = json!(-125000000.0);
            conf.mark_dirty();
        })
    };

    barrier.wait();
    let conf = manager.acquire();
    assert_eq!(conf["frequency"], json!(7100000.0));
    assert_eq!(conf["manualOffset"], json!(-125000000.0));
    drop(conf);
    writer.join().unwrap();
}

#[test]
fn autosave_persists_dirty_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let manager = loaded_manager(&dir);
    manager.enable_autosave_every(TICK);

    {
        let mut conf = manager.acquire();
        conf["theme"] = json!("Light");
        conf.mark_dirty();
    }
    thread::sleep(SETTLE);
    assert_eq!(read_config(&path).unwrap()["theme"], json!("Light"));
    manager.disable_autosave();
}

#[test]
fn autosave_does_not_rewrite_a_clean_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let manager = loaded_manager(&dir);

    let before = fs::metadata(&path).unwrap().modified().unwrap();
    manager.enable_autosave_every(TICK);
    thread::sleep(SETTLE);
    manager.disable_autosave();

    let after = fs::metadata(&path).unwrap().modified().unwrap();
    assert_eq!(before, after);
}

#[test]
fn mutation_without_mark_dirty_is_not_autosaved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let manager = loaded_manager(&dir);
    manager.enable_autosave_every(TICK);

    {
        let mut conf = manager.acquire();
        conf["theme"] = json!("Light");
    }
    thread::sleep(SETTLE);
    manager.disable_autosave();
    assert_eq!(read_config(&path).unwrap()["theme"], json!("Dark"));
}

#[test]
fn autosave_retries_after_a_failed_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let manager = loaded_manager(&dir);

    // Block the temporary file slot so the first tick fails.
    let tmp_block = dir.path().join("config.tmp");
    fs::create_dir(&tmp_block).unwrap();

    manager.enable_autosave_every(TICK);
    {
        let mut conf = manager.acquire();
        conf["theme"] = json!("Light");
        conf.mark_dirty();
    }
    thread::sleep(SETTLE);
    assert_eq!(read_config(&path).unwrap()["theme"], json!("Dark"));

    fs::remove_dir(&tmp_block).unwrap();
    thread::sleep(SETTLE);
    assert_eq!(read_config(&path).unwrap()["theme"], json!("Light"));
    manager.disable_autosave();
}

#[test]
fn explicit_save_persists_even_when_clean() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let manager = loaded_manager(&dir);

    {
        let mut conf = manager.acquire();
        conf["theme"] = json!("Light");
        // No mark_dirty: an explicit save still persists.
    }
    manager.save().unwrap();
    assert_eq!(read_config(&path).unwrap()["theme"], json!("Light"));
}

#[test]
fn failed_save_keeps_the_dirty_state_for_retry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let manager = loaded_manager(&dir);

    let tmp_block = dir.path().join("config.tmp");
    fs::create_dir(&tmp_block).unwrap();
    {
        let mut conf = manager.acquire();
        conf["theme"] = json!("Light");
        conf.mark_dirty();
    }
    assert!(manager.save().is_err());
    assert_eq!(read_config(&path).unwrap()["theme"], json!("Dark"));

    fs::remove_dir(&tmp_block).unwrap();
    manager.save().unwrap();
    assert_eq!(read_config(&path).unwrap()["theme"], json!("Light"));
}
