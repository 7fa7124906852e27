//! Show or initialize the configuration file.

use snapbooth_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, init: bool, force: bool) -> anyhow::Result<()> {
    let path = config_file_path();

    if init {
        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        let written = AppConfig::default().save()?;
        println!("Wrote default configuration to {}", written.display());
        return Ok(());
    }

    let origin = if path.exists() { "file" } else { "defaults" };
    println!("# {} ({origin})", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
