//! Crop bounds and watermark placement.
//!
//! Pure functions of the parameters and the source dimensions. Nothing here
//! touches pixels; the compositor consumes the rectangles computed here.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner of the target image
//! - Crop margins are whole pixels measured inward from each edge
//! - Watermark placement is fractional and may extend past the target;
//!   the compositor clips whatever falls outside

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distance kept between a corner-anchored watermark and the image edges.
pub const WATERMARK_PADDING: f64 = 20.0;

/// Accepted range for watermark size and opacity percentages.
pub const PERCENT_RANGE: std::ops::RangeInclusive<u8> = 10..=100;

/// Errors from geometry computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The margins leave no pixels in at least one dimension.
    #[error(
        "Crop {crop} leaves nothing of a {source_width}x{source_height} image"
    )]
    InvalidCrop {
        source_width: u32,
        source_height: u32,
        crop: CropParams,
    },
}

/// Errors from out-of-range watermark parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("Watermark size must be between 10 and 100 percent, got {0}")]
    SizeOutOfRange(u8),

    #[error("Watermark opacity must be between 10 and 100 percent, got {0}")]
    OpacityOutOfRange(u8),
}

/// Pixel margins removed from each edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropParams {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl CropParams {
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Clamp each margin to `[0, dimension]` for display in a form.
    ///
    /// Clamping alone does not make a crop valid; [`crop_bounds`] still decides.
    pub fn clamped_to(self, width: u32, height: u32) -> Self {
        Self {
            top: self.top.min(height),
            bottom: self.bottom.min(height),
            left: self.left.min(width),
            right: self.right.min(width),
        }
    }
}

impl std::fmt::Display for CropParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(top {}, bottom {}, left {}, right {})",
            self.top, self.bottom, self.left, self.right
        )
    }
}

/// Integer rectangle inside a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where a watermark anchors on the target image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Watermark scale, opacity and anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatermarkParams {
    /// Watermark width as a percentage of the target width (10 to 100)
    pub size_percent: u8,
    /// Opacity multiplier in percent (10 to 100)
    pub opacity_percent: u8,
    pub position: WatermarkPosition,
}

impl Default for WatermarkParams {
    fn default() -> Self {
        Self {
            size_percent: 100,
            opacity_percent: 100,
            position: WatermarkPosition::Center,
        }
    }
}

impl WatermarkParams {
    /// Create validated parameters.
    pub fn new(
        size_percent: u8,
        opacity_percent: u8,
        position: WatermarkPosition,
    ) -> Result<Self, ParamError> {
        let params = Self {
            size_percent,
            opacity_percent,
            position,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check both percentages against [`PERCENT_RANGE`].
    ///
    /// Deserialized parameters bypass [`WatermarkParams::new`], so batch entry
    /// points call this before processing.
    pub fn validate(&self) -> Result<(), ParamError> {
        if !PERCENT_RANGE.contains(&self.size_percent) {
            return Err(ParamError::SizeOutOfRange(self.size_percent));
        }
        if !PERCENT_RANGE.contains(&self.opacity_percent) {
            return Err(ParamError::OpacityOutOfRange(self.opacity_percent));
        }
        Ok(())
    }

    /// Opacity as a fraction in `0.0..=1.0`.
    #[inline]
    pub fn opacity(&self) -> f64 {
        self.opacity_percent as f64 / 100.0
    }
}

/// Fractional watermark rectangle in target pixel coordinates.
///
/// Coordinates may be negative and the rectangle may extend past the
/// target in any direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Placement snapped to whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Snap to the pixel grid. The size never drops below 1x1.
    pub fn to_pixel_rect(&self) -> PixelRect {
        PixelRect {
            x: self.x.round() as i64,
            y: self.y.round() as i64,
            width: (self.width.round() as u32).max(1),
            height: (self.height.round() as u32).max(1),
        }
    }
}

/// Output size a crop would produce, which may be zero or negative.
pub fn cropped_dimensions(source_width: u32, source_height: u32, crop: &CropParams) -> (i64, i64) {
    (
        source_width as i64 - crop.left as i64 - crop.right as i64,
        source_height as i64 - crop.top as i64 - crop.bottom as i64,
    )
}

/// Compute the region kept by a crop.
///
/// # Errors
///
/// Returns `GeometryError::InvalidCrop` when the resulting width or height
/// would be zero or negative. Margins are never trusted to be pre-clamped.
pub fn crop_bounds(
    source_width: u32,
    source_height: u32,
    crop: &CropParams,
) -> Result<Rect, GeometryError> {
    let (width, height) = cropped_dimensions(source_width, source_height, crop);

    if width <= 0 || height <= 0 {
        return Err(GeometryError::InvalidCrop {
            source_width,
            source_height,
            crop: *crop,
        });
    }

    Ok(Rect {
        x: crop.left,
        y: crop.top,
        width: width as u32,
        height: height as u32,
    })
}

/// Compute where and how large a watermark is drawn on a target image.
///
/// The width is `size_percent` of the target width and the height follows
/// the watermark's own aspect ratio. Corner positions keep
/// [`WATERMARK_PADDING`] from both adjacent edges; center ignores padding.
/// The result is never clamped to the target.
pub fn watermark_placement(
    target_width: u32,
    target_height: u32,
    wm_width: u32,
    wm_height: u32,
    params: &WatermarkParams,
) -> Placement {
    let target_w = target_width as f64;
    let target_h = target_height as f64;

    let width = target_w * (params.size_percent as f64 / 100.0);
    let height = if wm_width == 0 {
        0.0
    } else {
        width * (wm_height as f64 / wm_width as f64)
    };

    let far_x = target_w - width - WATERMARK_PADDING;
    let far_y = target_h - height - WATERMARK_PADDING;

    let (x, y) = match params.position {
        WatermarkPosition::TopLeft => (WATERMARK_PADDING, WATERMARK_PADDING),
        WatermarkPosition::TopRight => (far_x, WATERMARK_PADDING),
        WatermarkPosition::BottomLeft => (WATERMARK_PADDING, far_y),
        WatermarkPosition::BottomRight => (far_x, far_y),
        WatermarkPosition::Center => ((target_w - width) / 2.0, (target_h - height) / 2.0),
    };

    Placement {
        x,
        y,
        width,
        height,
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
