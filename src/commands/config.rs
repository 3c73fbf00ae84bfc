use std::path::Path;
use std::process::ExitCode;

use agent_sidebar::config::{xdg, ConfigLoader};

/// Prints the configuration file path in use.
pub(crate) fn run_config_path(explicit: Option<&Path>) -> ExitCode {
    match explicit {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", xdg::config_path().display()),
    }
    ExitCode::SUCCESS
}

/// Loads and validates the configuration, printing the effective values.
pub(crate) fn run_config_validate(explicit: Option<&Path>) -> ExitCode {
    let result = ConfigLoader::load(explicit).and_then(|config| {
        config.validate()?;
        Ok(config)
    });
    match result {
        Ok(config) => {
            println!("Configuration is valid");
            println!("{config:#?}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}
