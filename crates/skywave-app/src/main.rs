use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use skywave_config::{default_config, ConfigManager};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Skywave software-defined radio receiver")]
struct Cli {
    /// Root directory holding the configuration (created if missing)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Run headless as a network server
    #[arg(short, long)]
    server: bool,

    /// Keep the console window attached (Windows only)
    #[arg(long)]
    con: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let args = Cli::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<()> {
    info!("Skywave v{}", env!("CARGO_PKG_VERSION"));

    if args.con && !cfg!(windows) {
        warn!("--con has no effect on this platform");
    }
    #[cfg(windows)]
    if !args.con && !args.server {
        free_console();
    }

    let root = match args.root {
        Some(root) => root,
        None => default_root().context("could not determine a default root directory")?,
    };
    let root = resolve_root(&root)?;

    let config = ConfigManager::new();
    config.set_path(root.join("config.json"))?;
    info!("Loading config");
    let report = config
        .load(default_config())
        .context("failed to load configuration")?;
    if report.recovered {
        warn!("previous configuration could not be parsed and was replaced with defaults");
    }
    config.enable_autosave();

    let ui_scale = {
        let conf = config.acquire();
        conf["uiScale"].as_f64().unwrap_or(1.0)
    };
    info!("UI scale: {ui_scale}");

    if args.server {
        info!("Running in server mode");
    } else {
        let res_dir: String = {
            let conf = config.acquire();
            conf["resourcesDirectory"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        };
        let res_dir = Path::new(&res_dir);
        if !res_dir.is_dir() {
            bail!(
                "resource directory {} doesn't exist, check resourcesDirectory in config.json",
                res_dir.display()
            );
        }
    }

    info!("Ready");

    config.disable_autosave();
    config.save().context("failed to save configuration")?;
    info!("Exiting successfully");
    Ok(())
}

fn default_root() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skywave"))
}

/// Ensures the root directory exists and actually is a directory, creating
/// it if absent. Runs before any configuration load is attempted.
fn resolve_root(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        warn!("root directory {} does not exist, creating it", root.display());
        fs::create_dir_all(root)
            .with_context(|| format!("could not create root directory {}", root.display()))?;
    }
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    Ok(root.to_path_buf())
}

#[cfg(windows)]
fn free_console() {
    #[link(name = "kernel32")]
    extern "system" {
        fn FreeConsole() -> i32;
    }
    let _ = unsafe { FreeConsole() };
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::resolve_root;

    #[test]
    fn resolve_root_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested/skywave");
        let resolved = resolve_root(&root).unwrap();
        assert!(resolved.is_dir());
    }

    #[test]
    fn resolve_root_rejects_regular_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("config-root");
        fs::write(&root, b"not a directory").unwrap();
        let err = resolve_root(&root).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
