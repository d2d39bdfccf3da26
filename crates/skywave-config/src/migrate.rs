use serde_json::{json, Value};
use tracing::{info, warn};

/// Top-level key holding the named module instances.
pub const MODULE_INSTANCES_KEY: &str = "moduleInstances";

/// Repairs structural drift between a loaded document and the default schema.
///
/// Top-level keys missing from `loaded` are inserted with their default
/// value; top-level keys unknown to `default` are removed. Unknown extensions
/// are deliberately not preserved. Entries under [`MODULE_INSTANCES_KEY`]
/// given in the legacy bare-string shape are rewritten to
/// `{"module": <name>, "enabled": true}`.
///
/// Migration is shallow: apart from the module-instance upgrade it never
/// descends into nested objects or arrays. It cannot fail; a document that is
/// not an object at all is replaced wholesale by the default. Returns whether
/// anything changed.
pub fn migrate(loaded: &mut Value, default: &Value) -> bool {
    let default_map = match default.as_object() {
        Some(map) => map,
        None => return false,
    };

    if !loaded.is_object() {
        warn!("config document is not an object, resetting to defaults");
        *loaded = default.clone();
        return true;
    }

    let mut changed = false;
    if let Some(map) = loaded.as_object_mut() {
        for (key, value) in default_map {
            if !map.contains_key(key) {
                info!("missing key in config {key}, repairing");
                map.insert(key.clone(), value.clone());
                changed = true;
            }
        }

        let unknown: Vec<String> = map
            .keys()
            .filter(|key| !default_map.contains_key(*key))
            .cloned()
            .collect();
        for key in unknown {
            info!("unused key in config {key}, repairing");
            map.remove(&key);
            changed = true;
        }

        if let Some(Value::Object(instances)) = map.get_mut(MODULE_INSTANCES_KEY) {
            for (name, entry) in instances.iter_mut() {
                let module = match entry {
                    Value::String(module) => module.clone(),
                    _ => continue,
                };
                info!("upgrading legacy module instance entry {name}");
                *entry = json!({ "module": module, "enabled": true });
                changed = true;
            }
        }
    }

    changed
}
