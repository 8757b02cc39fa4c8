//! Configuration commands.

use std::path::Path;

use calmerge_server::AppConfig;

use crate::error::ClientResult;

/// Dump the current configuration to stdout.
pub fn dump(config: &AppConfig, path: &Path) -> ClientResult<()> {
    let toml_str = config.to_toml()?;
    println!("# {}", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
///
/// Loading already validated it; this reports what was found.
pub fn validate(config: &AppConfig) -> ClientResult<()> {
    config.validate()?;

    let enabled = config.enabled_sources().count();
    println!(
        "Configuration is valid: {} source(s), {} enabled.",
        config.sources.len(),
        enabled
    );
    if enabled == 0 {
        println!("warning: no enabled sources, every calendar will be empty");
    }
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
