//! Init command implementation.

use crate::workspace::{Settings, Workspace, SETTINGS_FILE};
use std::error::Error;
use std::path::Path;

/// Writes a settings file targeting `spreadsheet_id`.
pub fn run(
    root: &Path,
    spreadsheet_id: &str,
    sync_interval_secs: Option<u64>,
    force: bool,
) -> Result<(), Box<dyn Error>> {
    let path = root.join(SETTINGS_FILE);
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }

    let settings = Settings {
        spreadsheet_id: Some(spreadsheet_id.to_string()),
        sync_interval_secs,
        ..Settings::default()
    };
    Workspace::write_settings(root, &settings)?;

    println!("✓ Workspace initialized");
    println!("  Settings: {}", path.display());
    println!("  Spreadsheet: {spreadsheet_id}");
    Ok(())
}
