//! Page geometry and typography

use serde::{Deserialize, Serialize};

use crate::constants::layout;
use crate::types::{ReportError, Result};

/// Page dimensions, margins, and type sizes in PDF points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Document title drawn in the header block
    pub title: String,

    pub width: f32,
    pub height: f32,

    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,

    pub body_font_size: f32,
    pub title_font_size: f32,
    pub section_title_font_size: f32,
    pub footer_font_size: f32,

    /// Line height as a multiple of font size
    pub line_spacing: f32,

    /// Height of one signature grid row
    pub signature_row_height: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageConfig {
    pub fn a4() -> Self {
        Self::with_size(layout::A4_WIDTH, layout::A4_HEIGHT)
    }

    pub fn letter() -> Self {
        Self::with_size(layout::LETTER_WIDTH, layout::LETTER_HEIGHT)
    }

    fn with_size(width: f32, height: f32) -> Self {
        Self {
            title: "Periodic Supervision Report".to_string(),
            width,
            height,
            margin_top: layout::DEFAULT_MARGIN,
            margin_bottom: layout::DEFAULT_MARGIN,
            margin_left: layout::DEFAULT_MARGIN,
            margin_right: layout::DEFAULT_MARGIN,
            body_font_size: layout::BODY_FONT_SIZE,
            title_font_size: layout::TITLE_FONT_SIZE,
            section_title_font_size: layout::SECTION_TITLE_FONT_SIZE,
            footer_font_size: layout::FOOTER_FONT_SIZE,
            line_spacing: layout::LINE_SPACING,
            signature_row_height: layout::SIGNATURE_ROW_HEIGHT,
        }
    }

    /// Horizontal space between the side margins
    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Lowest y (from the top edge) any block may reach
    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin_bottom
    }

    /// Vertical space an empty page offers
    pub fn usable_height(&self) -> f32 {
        self.content_bottom() - self.margin_top
    }

    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_spacing
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("body_font_size", self.body_font_size),
            ("title_font_size", self.title_font_size),
            ("section_title_font_size", self.section_title_font_size),
            ("footer_font_size", self.footer_font_size),
            ("line_spacing", self.line_spacing),
            ("signature_row_height", self.signature_row_height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ReportError::Config(format!(
                    "layout.{} must be greater than 0, got {}",
                    name, value
                )));
            }
        }

        let margins = [
            self.margin_top,
            self.margin_bottom,
            self.margin_left,
            self.margin_right,
        ];
        if margins.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(ReportError::Config(
                "layout margins must be non-negative".to_string(),
            ));
        }

        if self.content_width() <= 0.0 || self.usable_height() <= 0.0 {
            return Err(ReportError::Config(format!(
                "layout margins leave no usable area on a {}x{} page",
                self.width, self.height
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_a4() {
        let config = PageConfig::default();
        assert_eq!(config.width, layout::A4_WIDTH);
        assert!(config.validate().is_ok());
        assert!((config.usable_height() - (layout::A4_HEIGHT - 112.0)).abs() < 1e-3);
    }

    #[test]
    fn test_margins_must_leave_room() {
        let config = PageConfig {
            margin_top: 500.0,
            margin_bottom: 400.0,
            ..PageConfig::a4()
        };
        assert!(matches!(config.validate(), Err(ReportError::Config(_))));

        let config = PageConfig {
            line_spacing: 0.0,
            ..PageConfig::letter()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PageConfig = toml::from_str("height = 600.0\ntitle = \"Weekly\"").unwrap();
        assert_eq!(config.height, 600.0);
        assert_eq!(config.title, "Weekly");
        assert_eq!(config.margin_left, layout::DEFAULT_MARGIN);
    }
}
