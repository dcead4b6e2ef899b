use std::path::PathBuf;
use std::process::ExitCode;

use atrium::{AppConfig, run};

/// Overrides where assets are read from.
const ASSET_ROOT_VAR: &str = "ATRIUM_ASSET_ROOT";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let asset_root = std::env::var_os(ASSET_ROOT_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"));

    let config = AppConfig::new().title("Atrium").asset_root(asset_root);
    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}
