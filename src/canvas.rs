//! RGBA drawing surface for one composited asset.

use crate::model::TextAlign;
use crate::text::TextMask;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Pixel, Rgba, RgbaImage};

pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// A surface sized to the background's natural dimensions, with the
    /// background already drawn at the origin.
    pub fn from_background(background: &DynamicImage) -> Self {
        Self {
            image: background.to_rgba8(),
        }
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Scale `src` to `width` x `height` and alpha-blend it centered on
    /// (`cx`, `cy`). Parts falling outside the surface are clipped.
    pub fn draw_image_centered(&mut self, src: &RgbaImage, cx: f32, cy: f32, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        let scaled;
        let src = if src.dimensions() == (width, height) {
            src
        } else {
            scaled = imageops::resize(src, width, height, FilterType::Triangle);
            &scaled
        };
        let left = (cx - width as f32 / 2.0).round() as i64;
        let top = (cy - height as f32 / 2.0).round() as i64;
        imageops::overlay(&mut self.image, src, left, top);
    }

    /// Fill the mask with `color`, anchored at (`x`, `y`): horizontally per
    /// `align`, vertically centered.
    pub fn fill_text(&mut self, mask: &TextMask, x: f32, y: f32, align: TextAlign, color: Rgba<u8>) {
        let w = mask.width as f32;
        let left = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - w / 2.0,
            TextAlign::Right => x - w,
        };
        let top = y - mask.height as f32 / 2.0;
        self.fill_mask(mask, left.round() as i64, top.round() as i64, color);
    }

    pub fn fill_mask(&mut self, mask: &TextMask, left: i64, top: i64, color: Rgba<u8>) {
        let (cw, ch) = (self.width() as i64, self.height() as i64);
        for my in 0..mask.height {
            let py = top + my as i64;
            if py < 0 || py >= ch {
                continue;
            }
            for mx in 0..mask.width {
                let px = left + mx as i64;
                if px < 0 || px >= cw {
                    continue;
                }
                let coverage = mask.coverage(mx, my);
                if coverage == 0 {
                    continue;
                }
                let mut ink = color;
                ink.0[3] = ((color.0[3] as u16 * coverage as u16) / 255) as u8;
                self.image.get_pixel_mut(px as u32, py as u32).blend(&ink);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_sets_dimensions() {
        let bg = DynamicImage::ImageRgba8(RgbaImage::new(64, 32));
        let canvas = Canvas::from_background(&bg);
        assert_eq!((canvas.width(), canvas.height()), (64, 32));
    }

    #[test]
    fn image_is_centered_on_anchor() {
        let mut canvas = Canvas::blank(40, 40);
        let red = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        canvas.draw_image_centered(&red, 20.0, 20.0, 10, 10);
        assert_eq!(canvas.image().get_pixel(15, 15).0, [255, 0, 0, 255]);
        assert_eq!(canvas.image().get_pixel(24, 24).0, [255, 0, 0, 255]);
        assert_eq!(canvas.image().get_pixel(14, 14).0, [255, 255, 255, 255]);
        assert_eq!(canvas.image().get_pixel(25, 25).0, [255, 255, 255, 255]);
    }

    #[test]
    fn clipped_draws_do_not_panic() {
        let mut canvas = Canvas::blank(20, 20);
        let red = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        canvas.draw_image_centered(&red, 0.0, 0.0, 30, 30);
        canvas.draw_image_centered(&red, 100.0, -50.0, 10, 10);
        let corner = canvas.image().get_pixel(0, 0).0;
        assert!(corner[0] > 250 && corner[1] < 5, "corner was {:?}", corner);
        assert_eq!(canvas.image().get_pixel(19, 19).0, [255, 255, 255, 255]);
    }

    #[test]
    fn text_alignment_moves_the_ink() {
        let mask = TextMask {
            width: 4,
            height: 2,
            data: vec![255; 8],
        };
        let black = Rgba([0, 0, 0, 255]);

        let mut left = Canvas::blank(20, 10);
        left.fill_text(&mask, 10.0, 5.0, TextAlign::Left, black);
        assert_eq!(left.image().get_pixel(10, 4).0, [0, 0, 0, 255]);
        assert_eq!(left.image().get_pixel(9, 4).0, [255, 255, 255, 255]);

        let mut right = Canvas::blank(20, 10);
        right.fill_text(&mask, 10.0, 5.0, TextAlign::Right, black);
        assert_eq!(right.image().get_pixel(9, 4).0, [0, 0, 0, 255]);
        assert_eq!(right.image().get_pixel(10, 4).0, [255, 255, 255, 255]);

        let mut center = Canvas::blank(20, 10);
        center.fill_text(&mask, 10.0, 5.0, TextAlign::Center, black);
        assert_eq!(center.image().get_pixel(8, 4).0, [0, 0, 0, 255]);
        assert_eq!(center.image().get_pixel(11, 5).0, [0, 0, 0, 255]);
        assert_eq!(center.image().get_pixel(12, 5).0, [255, 255, 255, 255]);
    }
}
