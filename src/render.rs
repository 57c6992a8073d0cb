pub mod file;

use anyhow::Result;

use crate::decode::DecodedImage;
use crate::events::MessageId;

/// Size of the display surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A fitted bitmap ready to paint, tagged with the message it came from.
#[derive(Debug, Clone)]
pub struct Frame {
    pub message_id: MessageId,
    pub image: DecodedImage,
}

/// Paints frames on the display surface. The renderer owns the frame it is
/// currently showing until the next call replaces it.
pub trait Renderer {
    /// Display bounds; read once when the slideshow starts.
    fn bounds(&self) -> Bounds;

    fn on_frame(&mut self, frame: Frame) -> Result<()>;

    /// Show the "no content" state.
    fn on_empty(&mut self) -> Result<()>;
}

pub fn center_offset(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> (u32, u32) {
    let ox = outer_w.saturating_sub(inner_w) / 2;
    let oy = outer_h.saturating_sub(inner_h) / 2;
    (ox, oy)
}

#[cfg(test)]
mod tests {
    use super::center_offset;

    #[test]
    fn centers_smaller_image_and_clamps_larger() {
        assert_eq!(center_offset(1080, 1080, 1920, 1080), (420, 0));
        assert_eq!(center_offset(2000, 500, 1920, 1080), (0, 290));
    }
}
