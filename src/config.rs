use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::shape::{Color, Tool};

pub const MIN_STROKE_WIDTH: f32 = 1.0;
pub const MAX_STROKE_WIDTH: f32 = 20.0;

/// Editor defaults, read from an optional JSON file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub tool: Tool,
    pub color: Color,
    pub stroke_width: f32,
    pub highlight_color: Color,
    /// Standard deviation of the blur region filter, in image pixels.
    pub blur_radius: f32,
    pub fit_padding: f32,
    pub zoom_step: f32,
    pub export_file_name: String,
    /// TrueType font for exported text; system fonts are tried when unset.
    pub font_path: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tool: Tool::Select,
            color: Color::RED,
            stroke_width: 4.0,
            highlight_color: Color::HIGHLIGHT,
            blur_radius: 10.0,
            fit_padding: 40.0,
            zoom_step: 0.1,
            export_file_name: "annotated-image.png".to_owned(),
            font_path: None,
        }
    }
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: EditorConfig = serde_json::from_str(&data)
            .with_context(|| format!("cannot parse config {}", path.display()))?;
        Ok(config.sanitized())
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.stroke_width = self.stroke_width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH);
        if !(self.blur_radius.is_finite() && self.blur_radius > 0.0) {
            self.blur_radius = defaults.blur_radius;
        }
        if !(self.fit_padding.is_finite() && self.fit_padding >= 0.0) {
            self.fit_padding = defaults.fit_padding;
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            self.zoom_step = defaults.zoom_step;
        }
        if self.export_file_name.trim().is_empty() {
            self.export_file_name = defaults.export_file_name;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::EditorConfig;
    use crate::shape::{Color, Tool};

    #[test]
    fn partial_file_keeps_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r##"{ "tool": "arrow", "color": "#00ff00" }"##).expect("config");
        assert_eq!(config.tool, Tool::Arrow);
        assert_eq!(config.color, Color::rgb(0, 255, 0));
        assert_eq!(config.fit_padding, 40.0);
        assert_eq!(config.blur_radius, 10.0);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let config = EditorConfig {
            stroke_width: 90.0,
            zoom_step: -1.0,
            export_file_name: " ".to_owned(),
            ..EditorConfig::default()
        }
        .sanitized();
        assert_eq!(config.stroke_width, 20.0);
        assert_eq!(config.zoom_step, 0.1);
        assert_eq!(config.export_file_name, "annotated-image.png");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = EditorConfig::load(std::path::Path::new("/nonexistent/annotate.json"))
            .expect_err("missing file");
        assert!(format!("{err:#}").contains("cannot read config"));
    }

    #[test]
    fn bad_color_is_rejected() {
        let result = serde_json::from_str::<EditorConfig>(r#"{ "color": "red" }"#);
        assert!(result.is_err());
    }
}
