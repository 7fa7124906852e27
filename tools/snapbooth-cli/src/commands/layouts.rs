//! Print and validate the slot geometry table.

use std::path::PathBuf;

use snapbooth_common::config::AppConfig;
use snapbooth_model::layout::LayoutKind;

pub fn run(config: &AppConfig, table: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let source = table
        .as_deref()
        .or(config.layout_table.as_deref())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    let table = super::load_layout_table(config, table.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!("Layout table ({source}): valid");
    println!("  Caption margin: {}px", table.caption_margin);
    for kind in LayoutKind::ALL {
        let geometry = table.geometry(kind);
        println!();
        println!(
            "{kind}: {} shot(s) on {}x{}",
            kind.shot_count(),
            geometry.canvas_width,
            geometry.canvas_height
        );
        for slot in geometry.slots() {
            println!(
                "  #{}  local ({}, {}) {}px   remote ({}, {}) {}px",
                slot.index + 1,
                slot.left.x,
                slot.left.y,
                slot.left.size,
                slot.right.x,
                slot.right.y,
                slot.right.size
            );
        }
    }

    Ok(())
}
