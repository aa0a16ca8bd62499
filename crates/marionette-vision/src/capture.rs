//! Screen capture for the vision-guided tier.
//!
//! Plan-guided automation only ever needs one thing from the screen: a
//! current image of the primary display to send to the planner. The
//! [`ScreenSource`] trait keeps that pluggable; the real implementation
//! uses `xcap`, the mock produces a blank frame for tests.

use async_trait::async_trait;
use image::DynamicImage;
use std::io::Cursor;
use thiserror::Error;

/// Errors that can occur during screen capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("screen capture not available on this platform")]
    NotAvailable,

    #[error("failed to capture screen: {0}")]
    CaptureFailed(String),

    #[error("no primary monitor found")]
    NoPrimaryMonitor,

    #[error("image encoding failed: {0}")]
    EncodingFailed(String),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// A captured frame of the primary display.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub image: DynamicImage,
    /// Unix milliseconds at capture time.
    pub timestamp: i64,
    /// Where the frame came from (monitor name or "mock").
    pub source: String,
}

impl Screenshot {
    pub fn new(image: DynamicImage, source: impl Into<String>) -> Self {
        Self {
            image,
            timestamp: chrono::Utc::now().timestamp_millis(),
            source: source.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encode as PNG, scaling down so neither dimension exceeds
    /// `max_dimension`. Planner payloads do not need full-resolution
    /// frames.
    pub fn encode_png(&self, max_dimension: u32) -> CaptureResult<Vec<u8>> {
        let image = if self.image.width() > max_dimension || self.image.height() > max_dimension {
            let scale = max_dimension as f64 / self.image.width().max(self.image.height()) as f64;
            let new_width = (self.image.width() as f64 * scale) as u32;
            let new_height = (self.image.height() as f64 * scale) as u32;
            self.image
                .resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
        } else {
            self.image.clone()
        };

        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
        Ok(buffer.into_inner())
    }

    /// Base64 PNG for API transmission.
    pub fn to_base64_png(&self, max_dimension: u32) -> CaptureResult<String> {
        let bytes = self.encode_png(max_dimension)?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            &bytes,
        ))
    }
}

/// Source of screen frames for the planner.
#[async_trait]
pub trait ScreenSource: Send + Sync {
    /// Whether capture can actually reach a display.
    fn is_available(&self) -> bool;

    /// Capture the primary display.
    async fn capture_primary(&self) -> CaptureResult<Screenshot>;
}

#[cfg(feature = "gui-automation")]
pub mod platform {
    use super::*;
    use image::{ImageBuffer, Rgba};

    /// Cross-platform capture via xcap.
    #[derive(Debug, Default)]
    pub struct XcapSource;

    impl XcapSource {
        pub fn new() -> Self {
            Self
        }

        fn convert_image(data: Vec<u8>, width: u32, height: u32) -> CaptureResult<DynamicImage> {
            // xcap hands back BGRA
            let mut rgba_data = data;
            for chunk in rgba_data.chunks_exact_mut(4) {
                chunk.swap(0, 2);
            }

            let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                ImageBuffer::from_raw(width, height, rgba_data).ok_or_else(|| {
                    CaptureError::CaptureFailed("failed to create image buffer".to_string())
                })?;
            Ok(DynamicImage::ImageRgba8(buffer))
        }
    }

    #[async_trait]
    impl ScreenSource for XcapSource {
        fn is_available(&self) -> bool {
            true
        }

        async fn capture_primary(&self) -> CaptureResult<Screenshot> {
            let monitor = xcap::Monitor::all()
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?
                .into_iter()
                .find(|m| m.is_primary())
                .ok_or(CaptureError::NoPrimaryMonitor)?;

            let capture = monitor
                .capture_image()
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

            let width = capture.width();
            let height = capture.height();
            let image = Self::convert_image(capture.into_raw(), width, height)?;

            Ok(Screenshot::new(image, monitor.name()))
        }
    }
}

/// Create the default screen source for this build.
#[cfg(feature = "gui-automation")]
pub fn create_screen_source() -> impl ScreenSource {
    platform::XcapSource::new()
}

#[cfg(not(feature = "gui-automation"))]
pub fn create_screen_source() -> impl ScreenSource {
    mock::MockSource::unavailable()
}

/// Mock source for tests. Always compiled.
pub mod mock {
    use super::*;

    /// Hands out blank frames, or refuses entirely.
    #[derive(Debug)]
    pub struct MockSource {
        available: bool,
        width: u32,
        height: u32,
    }

    impl MockSource {
        pub fn new() -> Self {
            Self {
                available: true,
                width: 640,
                height: 480,
            }
        }

        pub fn unavailable() -> Self {
            Self {
                available: false,
                width: 0,
                height: 0,
            }
        }
    }

    impl Default for MockSource {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ScreenSource for MockSource {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn capture_primary(&self) -> CaptureResult<Screenshot> {
            if !self.available {
                return Err(CaptureError::NotAvailable);
            }
            let image = DynamicImage::new_rgba8(self.width, self.height);
            Ok(Screenshot::new(image, "mock"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockSource;
    use super::*;

    #[tokio::test]
    async fn mock_source_produces_frames() {
        let source = MockSource::new();
        assert!(source.is_available());
        let shot = source.capture_primary().await.unwrap();
        assert_eq!(shot.width(), 640);
        assert_eq!(shot.source, "mock");
    }

    #[tokio::test]
    async fn encode_scales_down_large_frames() {
        let image = DynamicImage::new_rgba8(4000, 2000);
        let shot = Screenshot::new(image, "test");
        let bytes = shot.encode_png(1920).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(decoded.width() <= 1920);
        assert!(decoded.height() <= 1920);
    }

    #[tokio::test]
    async fn base64_is_valid_png() {
        let shot = MockSource::new().capture_primary().await.unwrap();
        let encoded = shot.to_base64_png(1920).unwrap();
        let bytes =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
