//! Composites a template and one data row into a finished raster.

use crate::canvas::Canvas;
use crate::decode::ImageDecoder;
use crate::error::{AppError, Result};
use crate::model::{DataRow, Template};
use crate::render::{Drawn, FieldRenderer, RenderContext};
use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

/// One composited row.
#[derive(Debug, Clone)]
pub struct Composite {
    pub image: RgbaImage,
    /// QR raster and payload of the last QR field drawn, if any
    pub qr: Option<(String, RgbaImage)>,
}

pub struct Compositor<'d> {
    decoder: &'d dyn ImageDecoder,
}

impl<'d> Compositor<'d> {
    pub fn new(decoder: &'d dyn ImageDecoder) -> Self {
        Self { decoder }
    }

    /// Decode the template's background. Fails with `NoTemplate` when none
    /// is set.
    pub fn load_background(&self, template: &Template) -> Result<DynamicImage> {
        let reference = template
            .background_image
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(AppError::missing_background)?;
        self.decoder.decode(reference)
    }

    /// Load the background and composite `row` onto it.
    pub fn compose(&self, template: &Template, row: &DataRow, ctx: &RenderContext<'_>) -> Result<Composite> {
        let background = self.load_background(template)?;
        Ok(self.compose_on(&background, template, row, ctx))
    }

    /// Composite `row` onto an already decoded background.
    ///
    /// Fields are drawn in template order so later fields cover earlier
    /// ones. A field that fails to draw is skipped; the row still completes.
    pub fn compose_on(
        &self,
        background: &DynamicImage,
        template: &Template,
        row: &DataRow,
        ctx: &RenderContext<'_>,
    ) -> Composite {
        let renderer = FieldRenderer::new(self.decoder);
        let mut canvas = Canvas::from_background(background);
        let mut qr = None;

        for field in &template.fields {
            match renderer.draw(&mut canvas, field, row.get(&field.id), ctx) {
                Ok(Drawn::Qr { payload, raster }) => {
                    debug!(field = %field.id, %payload, "drew qr code");
                    qr = Some((payload, raster));
                }
                Ok(drawn) => debug!(field = %field.id, ?drawn, "drew field"),
                Err(e) => warn!(field = %field.id, error = %e, "skipping field"),
            }
        }

        Composite {
            image: canvas.into_image(),
            qr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DATE_FORMAT;
    use crate::decode::{encode_png, to_data_url, DefaultDecoder};
    use crate::model::{Field, FieldBody, Position, Size, TemplateKind};
    use chrono::NaiveDate;
    use image::Rgba;

    fn ctx() -> RenderContext<'static> {
        RenderContext {
            today: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            date_format: DEFAULT_DATE_FORMAT,
            qr_payload: "LAZYSLOTH-1-0",
        }
    }

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> String {
        let img = RgbaImage::from_pixel(w, h, Rgba(rgba));
        to_data_url("image/png", &encode_png(&img).unwrap())
    }

    fn image_field(id: &str, x: f32, y: f32) -> Field {
        Field {
            id: id.to_string(),
            name: id.to_string(),
            required: false,
            position: Position { x, y },
            default_value: None,
            body: FieldBody::Image {
                size: Size { width: 20, height: 20 },
            },
        }
    }

    #[test]
    fn no_background_is_rejected() {
        let template = Template::new(TemplateKind::Badge, "t");
        let compositor = Compositor::new(&DefaultDecoder);
        let err = compositor.compose(&template, &DataRow::new(), &ctx()).unwrap_err();
        assert!(matches!(err, AppError::NoTemplate(_)));
    }

    #[test]
    fn output_matches_background_size() {
        let mut template = Template::new(TemplateKind::Certificate, "t");
        template.background_image = Some(solid(120, 80, [255, 255, 255, 255]));
        let compositor = Compositor::new(&DefaultDecoder);
        let out = compositor
            .compose(&template, &DataRow::new().with("name", "Ann"), &ctx())
            .unwrap();
        assert_eq!(out.image.dimensions(), (120, 80));
        assert!(out.qr.is_none());
    }

    #[test]
    fn broken_image_field_does_not_fail_row() {
        let mut template = Template::new(TemplateKind::Badge, "t");
        template.background_image = Some(solid(50, 50, [255, 255, 255, 255]));
        template.fields = vec![image_field("photo", 25.0, 25.0)];
        let compositor = Compositor::new(&DefaultDecoder);
        let row = DataRow::new().with("photo", "/missing/photo.png");
        let out = compositor.compose(&template, &row, &ctx()).unwrap();
        assert!(out.image.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn later_fields_cover_earlier_ones() {
        let mut template = Template::new(TemplateKind::Badge, "t");
        template.background_image = Some(solid(50, 50, [255, 255, 255, 255]));
        template.fields = vec![image_field("a", 25.0, 25.0), image_field("b", 25.0, 25.0)];
        let row = DataRow::new()
            .with("a", solid(2, 2, [255, 0, 0, 255]))
            .with("b", solid(2, 2, [0, 0, 255, 255]));
        let compositor = Compositor::new(&DefaultDecoder);

        let ab = compositor.compose(&template, &row, &ctx()).unwrap();
        template.fields.reverse();
        let ba = compositor.compose(&template, &row, &ctx()).unwrap();

        let top_ab = ab.image.get_pixel(25, 25).0;
        let top_ba = ba.image.get_pixel(25, 25).0;
        assert!(top_ab[2] > 250 && top_ab[0] < 5, "expected blue on top, got {:?}", top_ab);
        assert!(top_ba[0] > 250 && top_ba[2] < 5, "expected red on top, got {:?}", top_ba);
    }
}
