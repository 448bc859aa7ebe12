//! Launcher icon rendering.
//!
//! Vendors rarely upload density-specific launcher assets, so the assembler
//! renders one from the brand's primary color: a solid tile with a darker
//! border ring, encoded as a 192x192 PNG.

use crate::bundler::error::EncodingError;
use crate::bundler::spec::Rgb;
use image::{ImageBuffer, Rgba};
use std::io::Cursor;

/// Rendered icon edge length in pixels.
pub const ICON_SIZE: u32 = 192;

const BORDER_WIDTH: u32 = 8;

/// Renders the launcher icon PNG for the given brand color.
pub fn render_launcher_icon(color: Rgb) -> Result<Vec<u8>, EncodingError> {
    let fill = Rgba([color.r, color.g, color.b, 0xFF]);
    let border = Rgba([
        (u16::from(color.r) * 3 / 4) as u8,
        (u16::from(color.g) * 3 / 4) as u8,
        (u16::from(color.b) * 3 / 4) as u8,
        0xFF,
    ]);

    let img = ImageBuffer::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let edge = x < BORDER_WIDTH
            || y < BORDER_WIDTH
            || x >= ICON_SIZE - BORDER_WIDTH
            || y >= ICON_SIZE - BORDER_WIDTH;
        if edge { border } else { fill }
    });

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_decodable_png_of_the_brand_color() {
        let bytes = render_launcher_icon(Rgb { r: 0x33, g: 0x66, b: 0xFF }).expect("render");
        let img = image::load_from_memory(&bytes).expect("valid png").to_rgba8();
        assert_eq!(img.dimensions(), (ICON_SIZE, ICON_SIZE));
        assert_eq!(
            img.get_pixel(ICON_SIZE / 2, ICON_SIZE / 2),
            &Rgba([0x33, 0x66, 0xFF, 0xFF])
        );
        assert_ne!(img.get_pixel(0, 0), img.get_pixel(ICON_SIZE / 2, ICON_SIZE / 2));
    }
}
