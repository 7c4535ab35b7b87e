use std::path::Path;

use colored::Colorize;

use crate::application::config::AppConfig;

/// Write the default configuration to `path` unless a file is already there.
/// Returns `true` if a file was written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn run_init(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        println!(
            "{} {}",
            "Configuration already exists:".yellow(),
            path.display()
        );
        return Ok(false);
    }
    AppConfig::default().save_to(path)?;
    println!("{} {}", "Wrote default configuration:".green(), path.display());
    println!("Add the units to watch under [general] services, then run `service-doctor daemon`.");
    Ok(true)
}
