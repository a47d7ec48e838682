use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};

const GLYPH_SIZE: i64 = 8;

/// Draws `text` in the 8x8 basic font, horizontally centred with its baseline
/// on the vertical middle. Pixels outside the image are clipped.
pub fn draw_centered(image: &mut RgbaImage, text: &str, color: Rgba<u8>, scale: u32) {
    let scale = i64::from(scale.max(1));
    let advance = GLYPH_SIZE * scale;
    let text_width = advance * text.chars().count() as i64;
    let width = i64::from(image.width());
    let height = i64::from(image.height());

    let origin_x = (width - text_width) / 2;
    let origin_y = height / 2 - advance;

    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let glyph_x = origin_x + advance * i as i64;

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if (*bits >> col) & 1 == 0 {
                    continue;
                }
                fill_block(
                    image,
                    glyph_x + col * scale,
                    origin_y + row as i64 * scale,
                    scale,
                    color,
                );
            }
        }
    }
}

fn fill_block(image: &mut RgbaImage, x: i64, y: i64, size: i64, color: Rgba<u8>) {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    for py in y.max(0)..(y + size).min(height) {
        for px in x.max(0)..(x + size).min(width) {
            image.put_pixel(px as u32, py as u32, color);
        }
    }
}
