use serde_json::{json, Value};

/// Builds the canonical default configuration document.
///
/// Pure and deterministic within one build; the only variation is the
/// platform-dependent asset directories. The top-level key set of this
/// document is the schema the migration engine enforces.
pub fn default_config() -> Value {
    json!({
        "bandColors": {
            "amateur": "#FF0000FF",
            "aviation": "#00FF00FF",
            "broadcast": "#0000FFFF",
            "marine": "#00FFFFFF",
            "military": "#FFFF00FF"
        },
        "bandPlan": "General",
        "bandPlanEnabled": true,
        "bandPlanPos": 0,
        "centerTuning": false,
        "colorMap": "Classic",
        "fftHold": false,
        "fftHoldSpeed": 60,
        "fftSmoothing": false,
        "fftSmoothingSpeed": 100,
        "snrSmoothing": false,
        "snrSmoothingSpeed": 20,
        "fastFFT": false,
        "fftHeight": 300,
        "fftRate": 20,
        "fftSize": 65536,
        "fftWindow": 2,
        "frequency": 100000000.0,
        "fullWaterfallUpdate": false,
        "max": 0.0,
        "min": -120.0,
        "maximized": false,
        "fullscreen": false,
        "menuElements": [
            { "name": "Source", "open": true },
            { "name": "Radio", "open": true },
            { "name": "Recorder", "open": true },
            { "name": "Sinks", "open": true },
            { "name": "Frequency Manager", "open": true },
            { "name": "VFO Colors", "open": true },
            { "name": "Band Plan", "open": true },
            { "name": "Display", "open": true }
        ],
        "menuWidth": 300,
        "lockMenuOrder": false,
        "moduleInstances": {
            "Audio Source": { "module": "audio_source", "enabled": true },
            "File Source": { "module": "file_source", "enabled": true },
            "Network Source": { "module": "network_source", "enabled": true },
            "RTL-SDR Source": { "module": "rtl_sdr_source", "enabled": true },
            "RTL-TCP Source": { "module": "rtl_tcp_source", "enabled": true },
            "SpyServer Source": { "module": "spyserver_source", "enabled": true },
            "Audio Sink": { "module": "audio_sink", "enabled": true },
            "Network Sink": { "module": "network_sink", "enabled": true },
            "Radio": { "module": "radio", "enabled": true },
            "Frequency Manager": { "module": "frequency_manager", "enabled": true },
            "Recorder": { "module": "recorder", "enabled": true },
            "Rigctl Server": { "module": "rigctl_server", "enabled": true }
        },
        "modules": [],
        "modulesDirectory": modules_directory(),
        "resourcesDirectory": resources_directory(),
        "offsets": {
            "SpyVerter": 120000000.0,
            "Ham-It-Up": 125000000.0,
            "MMDS S-band (1998MHz)": -1998000000.0,
            "DK5AV X-Band": -6800000000.0,
            "Ku LNB (9750MHz)": -9750000000.0,
            "Ku LNB (10700MHz)": -10700000000.0
        },
        "selectedOffset": "None",
        "manualOffset": 0.0,
        "showMenu": true,
        "showWaterfall": true,
        "source": "",
        "decimation": 1,
        "iqCorrection": false,
        "invertIQ": false,
        "streams": {
            "Radio": { "muted": false, "sink": "Audio", "volume": 1.0 }
        },
        "theme": "Dark",
        "uiScale": 1.0,
        "vfoOffsets": {},
        "vfoColors": {
            "Radio": "#FFFFFF"
        },
        "windowSize": { "w": 1280, "h": 720 }
    })
}

fn modules_directory() -> &'static str {
    if cfg!(windows) {
        "./modules"
    } else if cfg!(target_os = "macos") {
        "/usr/local/lib/skywave/plugins"
    } else {
        "/usr/lib/skywave/plugins"
    }
}

fn resources_directory() -> &'static str {
    if cfg!(windows) {
        "./res"
    } else if cfg!(target_os = "macos") {
        "/usr/local/share/skywave"
    } else {
        "/usr/share/skywave"
    }
}
