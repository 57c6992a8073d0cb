//! Headless kiosk renderer: composites each frame onto a black canvas the size
//! of the display and atomically replaces a PNG on disk. A framebuffer viewer
//! watching that file does the actual painting.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{ImageFormat, Rgba, RgbaImage, imageops};
use tracing::{debug, info};

use super::{Bounds, Frame, Renderer, center_offset};

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug)]
pub struct FileRenderer {
    output: PathBuf,
    bounds: Bounds,
    current: Option<Frame>,
}

impl FileRenderer {
    pub fn new(output: impl Into<PathBuf>, bounds: Bounds) -> Self {
        Self {
            output: output.into(),
            bounds,
            current: None,
        }
    }

    /// The frame currently on screen, if any.
    pub fn current(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    fn blank_canvas(&self) -> RgbaImage {
        RgbaImage::from_pixel(self.bounds.width, self.bounds.height, BACKGROUND)
    }

    fn write_canvas(&self, canvas: &RgbaImage) -> Result<()> {
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut staging = self.output.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        canvas
            .save_with_format(&staging, ImageFormat::Png)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &self.output).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                staging.display(),
                self.output.display()
            )
        })?;
        Ok(())
    }
}

impl Renderer for FileRenderer {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn on_frame(&mut self, frame: Frame) -> Result<()> {
        let mut canvas = self.blank_canvas();
        let (w, h) = frame.image.dimensions();
        let (ox, oy) = center_offset(w, h, self.bounds.width, self.bounds.height);
        imageops::overlay(&mut canvas, frame.image.pixels(), i64::from(ox), i64::from(oy));
        self.write_canvas(&canvas)?;
        debug!(
            message_id = %frame.message_id,
            width = w,
            height = h,
            output = %self.output.display(),
            "frame written"
        );
        // replacing the previous frame releases it
        self.current = Some(frame);
        Ok(())
    }

    fn on_empty(&mut self) -> Result<()> {
        self.current = None;
        self.write_canvas(&self.blank_canvas())?;
        info!(output = %self.output.display(), "showing empty screen");
        Ok(())
    }
}
