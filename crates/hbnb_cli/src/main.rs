//! Storage bootstrap probe.
//!
//! # Responsibility
//! - Resolve configuration from the environment, start logging and open
//!   the selected repository backend.
//! - Seed the built-in countries and print one line per collection.
//!
//! Exit code 2 means the configuration or the backend was rejected.

use hbnb_core::{
    core_version, default_log_level, init_logging, populate_countries, AppConfig, EntityKind,
    LogTarget, RepositoryManager,
};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("hbnb: {err}");
            return ExitCode::from(2);
        }
    };

    let level = config
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    if let Err(err) = init_logging(&level, LogTarget::from_dir(config.log_dir.clone())) {
        eprintln!("hbnb: logging disabled: {err}");
    }

    let manager = match RepositoryManager::from_config(&config.storage) {
        Ok(manager) => manager,
        Err(err) => {
            eprintln!("hbnb: {err}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = populate_countries(&manager) {
        error!("event=seed_countries module=cli status=error error={err}");
        eprintln!("hbnb: seeding failed: {err}");
        return ExitCode::FAILURE;
    }

    println!("hbnb_core version={}", core_version());
    println!("repository={}", manager.kind());
    for kind in EntityKind::ALL {
        match manager.get_all(kind) {
            Ok(records) => println!("{kind} count={}", records.len()),
            Err(err) => {
                eprintln!("hbnb: failed to list {kind}: {err}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
