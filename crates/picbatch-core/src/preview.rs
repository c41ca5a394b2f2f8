//! On-demand previews of a stage applied to the first selected image.
//!
//! The caller decodes the preview source once and calls a `recompute_*`
//! method after every parameter change. Transforms run at full resolution
//! so margins and padding match the batch output; only the final raster is
//! scaled down for display when a maximum edge is set.

use thiserror::Error;

use crate::batch::{crop_raster, watermark_raster};
use crate::decode::{decode_image, DecodeError, RasterBuffer};
use crate::encode::{encode_png, EncodeError};
use crate::geometry::{cropped_dimensions, CropParams, ParamError, WatermarkParams};
use crate::transform::{resize_to_fit, TransformError};
use crate::ImageAsset;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Params(#[from] ParamError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// A rendered preview.
#[derive(Debug, Clone)]
pub struct Preview {
    /// Output width before any display scaling
    pub width: u32,
    /// Output height before any display scaling
    pub height: u32,
    /// PNG bytes, scaled to the maximum edge if one is set
    pub png: Vec<u8>,
}

/// Decoded preview inputs, reused across parameter changes.
#[derive(Debug, Clone)]
pub struct PreviewSource {
    raster: RasterBuffer,
    watermark: Option<RasterBuffer>,
    max_edge: Option<u32>,
}

impl PreviewSource {
    /// Decode the image to preview.
    pub fn new(source: &ImageAsset) -> Result<Self, PreviewError> {
        Ok(Self {
            raster: decode_image(&source.bytes)?,
            watermark: None,
            max_edge: None,
        })
    }

    /// Scale rendered previews so their longest edge fits `max_edge`.
    pub fn with_max_edge(mut self, max_edge: u32) -> Self {
        self.max_edge = Some(max_edge);
        self
    }

    /// Decode and keep the watermark used by [`PreviewSource::recompute_watermark`].
    pub fn set_watermark(&mut self, watermark: &ImageAsset) -> Result<(), PreviewError> {
        self.watermark = Some(decode_image(&watermark.bytes)?);
        Ok(())
    }

    /// Forget the watermark, e.g. after the user picked another one.
    pub fn clear_watermark(&mut self) {
        self.watermark = None;
    }

    pub fn has_watermark(&self) -> bool {
        self.watermark.is_some()
    }

    /// Size the crop would produce; zero or negative when it is invalid.
    pub fn cropped_dimensions(&self, params: &CropParams) -> (i64, i64) {
        cropped_dimensions(self.raster.width, self.raster.height, params)
    }

    /// Render the crop. `None` when the margins leave nothing to show.
    pub fn recompute_crop(&self, params: &CropParams) -> Result<Option<Preview>, PreviewError> {
        match crop_raster(&self.raster, params) {
            Ok(cropped) => self.render(cropped).map(Some),
            Err(err) => {
                tracing::debug!(error = %err, "Crop preview cleared");
                Ok(None)
            }
        }
    }

    /// Render the watermark. `None` until a watermark has been set.
    pub fn recompute_watermark(
        &self,
        params: &WatermarkParams,
    ) -> Result<Option<Preview>, PreviewError> {
        let Some(watermark) = &self.watermark else {
            return Ok(None);
        };
        params.validate()?;

        let stamped = watermark_raster(&self.raster, watermark, params)?;
        self.render(stamped).map(Some)
    }

    fn render(&self, raster: RasterBuffer) -> Result<Preview, PreviewError> {
        let (width, height) = (raster.width, raster.height);
        let display = match self.max_edge {
            Some(edge) => resize_to_fit(&raster, edge)?,
            None => raster,
        };

        Ok(Preview {
            width,
            height,
            png: encode_png(&display)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WatermarkPosition;
    use crate::test_support::{corrupt_asset, png_asset};

    fn decoded_size(png: &[u8]) -> (u32, u32) {
        let raster = decode_image(png).unwrap();
        (raster.width, raster.height)
    }

    #[test]
    fn test_crop_preview() {
        let source = PreviewSource::new(&png_asset("a.png", 100, 60, [0, 0, 0, 255])).unwrap();
        let preview = source
            .recompute_crop(&CropParams::new(5, 5, 10, 10))
            .unwrap()
            .unwrap();

        assert_eq!((preview.width, preview.height), (80, 50));
        assert_eq!(decoded_size(&preview.png), (80, 50));
    }

    #[test]
    fn test_crop_preview_cleared_when_invalid() {
        let source = PreviewSource::new(&png_asset("a.png", 20, 20, [0, 0, 0, 255])).unwrap();
        let params = CropParams::new(10, 10, 0, 0);

        assert!(source.recompute_crop(&params).unwrap().is_none());
        assert_eq!(source.cropped_dimensions(&params), (20, 0));
    }

    #[test]
    fn test_preview_scaled_to_max_edge() {
        let source = PreviewSource::new(&png_asset("a.png", 400, 200, [9, 9, 9, 255]))
            .unwrap()
            .with_max_edge(100);
        let preview = source
            .recompute_crop(&CropParams::default())
            .unwrap()
            .unwrap();

        assert_eq!((preview.width, preview.height), (400, 200));
        assert_eq!(decoded_size(&preview.png), (100, 50));
    }

    #[test]
    fn test_watermark_preview_requires_watermark() {
        let mut source =
            PreviewSource::new(&png_asset("a.png", 50, 50, [255, 255, 255, 255])).unwrap();
        let params = WatermarkParams::new(50, 80, WatermarkPosition::TopLeft).unwrap();
        assert!(source.recompute_watermark(&params).unwrap().is_none());

        source
            .set_watermark(&png_asset("wm.png", 10, 10, [0, 0, 0, 255]))
            .unwrap();
        assert!(source.has_watermark());

        let preview = source.recompute_watermark(&params).unwrap().unwrap();
        assert_eq!((preview.width, preview.height), (50, 50));

        source.clear_watermark();
        assert!(!source.has_watermark());
        assert!(source.recompute_watermark(&params).unwrap().is_none());
    }

    #[test]
    fn test_watermark_preview_rejects_bad_params() {
        let mut source = PreviewSource::new(&png_asset("a.png", 50, 50, [0, 0, 0, 255])).unwrap();
        source
            .set_watermark(&png_asset("wm.png", 10, 10, [0, 0, 0, 255]))
            .unwrap();
        let params = WatermarkParams {
            opacity_percent: 0,
            ..WatermarkParams::default()
        };
        assert!(matches!(
            source.recompute_watermark(&params),
            Err(PreviewError::Params(ParamError::OpacityOutOfRange(0)))
        ));
    }

    #[test]
    fn test_preview_source_rejects_corrupt_image() {
        assert!(matches!(
            PreviewSource::new(&corrupt_asset("x.png")),
            Err(PreviewError::Decode(_))
        ));
    }
}
