//! Tray icon generation
//!
//! Draws a small status dot programmatically so no icon assets need to ship
//! with the binary.

use image::{ImageBuffer, Rgba};

/// Mapping status shown by the icon color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconState {
    /// A controller is connected and mapping is active
    Active,
    /// Mapping is paused or idled
    Paused,
    /// No controller connected
    Disconnected,
}

const ICON_SIZE: u32 = 16;

/// Render a 16x16 status dot with a darker rim.
pub fn generate_icon(state: IconState) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    let (r, g, b) = match state {
        IconState::Active => (40, 190, 40),
        IconState::Paused => (210, 180, 30),
        IconState::Disconnected => (130, 130, 130),
    };

    let mut img = ImageBuffer::new(ICON_SIZE, ICON_SIZE);
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;
    let radius = 6.5;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        let distance = (dx * dx + dy * dy).sqrt();

        *pixel = if distance <= radius - 1.5 {
            Rgba([r, g, b, 255])
        } else if distance <= radius {
            // Rim at half brightness so the dot reads on light taskbars
            Rgba([r / 2, g / 2, b / 2, 255])
        } else {
            Rgba([0, 0, 0, 0])
        };
    }

    img
}

/// Render the icon straight to the RGBA byte layout `tray_icon` expects.
pub fn generate_icon_bytes(state: IconState) -> Vec<u8> {
    generate_icon(state).into_raw()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_dimensions_and_byte_length() {
        let img = generate_icon(IconState::Active);
        assert_eq!(img.width(), 16);
        assert_eq!(img.height(), 16);
        assert_eq!(generate_icon_bytes(IconState::Active).len(), 16 * 16 * 4);
    }

    #[test]
    fn states_render_distinct_centers() {
        let active = generate_icon(IconState::Active);
        let paused = generate_icon(IconState::Paused);
        let off = generate_icon(IconState::Disconnected);

        assert_eq!(active.get_pixel(8, 8)[1], 190);
        assert_eq!(paused.get_pixel(8, 8)[0], 210);
        assert_eq!(off.get_pixel(8, 8)[0], 130);
    }

    #[test]
    fn corners_are_transparent() {
        let img = generate_icon(IconState::Active);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(15, 15)[3], 0);
    }
}
