pub mod config;
pub mod layouts;
pub mod pair;
pub mod shoot;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use snapbooth_capture_engine::{
    open_source, BoothController, CapturePipeline, FinishConfig, PipelineConfig,
};
use snapbooth_common::config::{AppConfig, BoothDefaults};
use snapbooth_common::error::{BoothError, BoothResult};
use snapbooth_model::layout::LayoutTable;
use snapbooth_model::settings::{BoothSettings, SettingKey};
use snapbooth_render_engine::CaptionFont;

use crate::console::ConsoleObserver;
use crate::BoothArgs;

const LOCAL_TINT: [u8; 3] = [220, 120, 90];
const REMOTE_TINT: [u8; 3] = [80, 140, 220];

/// The configured geometry table, or the built-in one. Validated either way.
pub fn load_layout_table(config: &AppConfig, explicit: Option<&Path>) -> BoothResult<LayoutTable> {
    let path = explicit.or(config.layout_table.as_deref());
    let table = match path {
        Some(path) => LayoutTable::load(path).map_err(|e| {
            BoothError::layout(format!("layout table {}: {e}", path.display()))
        })?,
        None => {
            let table = LayoutTable::default();
            table
                .validate()
                .map_err(|e| BoothError::layout(format!("built-in layout table: {e}")))?;
            table
        }
    };
    Ok(table)
}

/// Configured defaults with command-line overrides applied.
pub fn booth_settings(defaults: &BoothDefaults, args: &BoothArgs) -> anyhow::Result<BoothSettings> {
    let mut settings = BoothSettings {
        border_width: defaults.border_width,
        ..BoothSettings::default()
    };
    let pairs = [
        (SettingKey::Layout, Some(&defaults.layout), args.layout.as_ref()),
        (SettingKey::Filter, Some(&defaults.filter), args.filter.as_ref()),
        (SettingKey::Paper, Some(&defaults.paper_color), args.paper.as_ref()),
        (SettingKey::Border, Some(&defaults.border_color), args.border.as_ref()),
        (SettingKey::Caption, None, args.caption.as_ref()),
    ];
    for (key, default, arg) in pairs {
        if let Some(value) = arg.or(default) {
            settings
                .apply(key, value)
                .with_context(|| format!("Invalid {key} {value:?}"))?;
        }
    }
    Ok(settings)
}

/// Build a controller for `args`, without a peer link.
pub fn build_controller(config: &AppConfig, args: &BoothArgs) -> anyhow::Result<BoothController> {
    let table = load_layout_table(config, None)?;
    let settings = booth_settings(&config.booth, args)?;

    let local = open_source("local", &args.local, LOCAL_TINT)
        .with_context(|| format!("Cannot open local camera {:?}", args.local))?;
    let remote = open_source("remote", &args.remote, REMOTE_TINT)
        .with_context(|| format!("Cannot open remote camera {:?}", args.remote))?;

    let pipeline = if args.instant {
        PipelineConfig {
            sound: config.booth.sound,
            thumbnail_size: config.booth.thumbnail_size,
            ..PipelineConfig::instant()
        }
    } else {
        PipelineConfig::from_defaults(&config.booth)
    };

    let font = CaptionFont::discover(config.booth.font_path.as_deref());
    match &font {
        Some(font) => tracing::debug!(font = %font.source().display(), "Caption font"),
        None => tracing::warn!("No caption font found; strips will have no caption text"),
    }

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());

    tracing::info!(
        layout = %settings.layout,
        filter = %settings.filter,
        output = %output_dir.display(),
        "Booth configured"
    );

    Ok(BoothController::new(
        Arc::new(table),
        settings,
        CapturePipeline::new(pipeline),
        local,
        remote,
    )
    .with_font(font)
    .with_finish(FinishConfig::from_defaults(&config.booth))
    .with_observer(Arc::new(ConsoleObserver::new(output_dir))))
}

#[cfg(test)]
mod tests {
    use snapbooth_model::layout::LayoutKind;
    use snapbooth_model::settings::{Color, Filter};

    use super::*;

    #[test]
    fn arguments_override_configured_defaults() {
        let defaults = BoothDefaults {
            filter: "sepia".to_string(),
            border_width: 6,
            ..BoothDefaults::default()
        };
        let args = BoothArgs {
            layout: Some("grid".to_string()),
            paper: Some("#000".to_string()),
            caption: Some("  Ana & Ben  ".to_string()),
            ..BoothArgs::default()
        };

        let settings = booth_settings(&defaults, &args).unwrap();
        assert_eq!(settings.layout, LayoutKind::TwoRow);
        assert_eq!(settings.filter, Filter::Sepia);
        assert_eq!(settings.paper, Color::rgb(0, 0, 0));
        assert_eq!(settings.border, Color::WHITE);
        assert_eq!(settings.border_width, 6);
        assert_eq!(settings.caption.as_deref(), Some("Ana & Ben"));
    }

    #[test]
    fn bad_configured_value_is_reported() {
        let defaults = BoothDefaults {
            layout: "collage".to_string(),
            ..BoothDefaults::default()
        };
        let err = booth_settings(&defaults, &BoothArgs::default()).unwrap_err();
        assert!(err.to_string().contains("layout"), "{err}");
    }

    #[test]
    fn missing_layout_table_is_an_error() {
        let config = AppConfig {
            layout_table: Some("/no/such/table.json".into()),
            ..AppConfig::default()
        };
        let err = load_layout_table(&config, None).unwrap_err();
        assert!(matches!(err, BoothError::Layout { .. }), "{err}");
        assert!(err.to_string().contains("/no/such/table.json"), "{err}");
        assert!(load_layout_table(&AppConfig::default(), None).is_ok());
    }

    #[test]
    fn overflowing_layout_table_is_a_layout_error() {
        let mut table = LayoutTable::default();
        table.single.rows[0].x = u32::MAX - 10;
        let path = std::env::temp_dir().join(format!(
            "snapbooth-overflow-table-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, serde_json::to_string(&table).unwrap()).unwrap();

        let err = load_layout_table(&AppConfig::default(), Some(&path)).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, BoothError::Layout { .. }), "{err}");
    }
}
