//! Batch generation: one composited asset per data row.
//!
//! Rows are processed strictly one after another. Progress is reported
//! after each finished row and results keep row order.

use crate::compositor::{Composite, Compositor};
use crate::config::GeneratorConfig;
use crate::decode::{ImageDecoder, ImageEncoder, PngEncoder};
use crate::error::{AppError, Result};
use crate::model::{DataRow, GeneratedResult, Template, SYNTHETIC_NAME_PREFIX};
use crate::qr::verification_payload;
use crate::render::RenderContext;
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f32 / self.total as f32
    }

    pub fn percent(&self) -> f32 {
        self.fraction() * 100.0
    }
}

/// Shared flag for stopping a batch between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub row_index: usize,
    pub reason: String,
}

/// Outcome of a batch that started. Results produced before a failure or
/// cancellation are always kept.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<GeneratedResult>,
    pub total: usize,
    pub failure: Option<BatchFailure>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && !self.cancelled && self.results.len() == self.total
    }
}

pub struct BatchGenerator<'d> {
    compositor: Compositor<'d>,
    encoder: &'d dyn ImageEncoder,
    qr_prefix: String,
    date_format: String,
    today: NaiveDate,
    started_at: DateTime<Utc>,
    cancel: CancelFlag,
}

impl<'d> BatchGenerator<'d> {
    pub fn new(decoder: &'d dyn ImageDecoder, config: &GeneratorConfig) -> Self {
        Self {
            compositor: Compositor::new(decoder),
            encoder: &PngEncoder,
            qr_prefix: config.qr_prefix.clone(),
            date_format: config.date_format.clone(),
            today: Local::now().date_naive(),
            started_at: Utc::now(),
            cancel: CancelFlag::new(),
        }
    }

    /// Date printed by date fields.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Batch start time; feeds QR verification codes and result timestamps.
    pub fn with_start_time(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Encoder for finished rows and their QR rasters; PNG by default.
    pub fn with_encoder(mut self, encoder: &'d dyn ImageEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Render every row of `rows` against `template`.
    ///
    /// Fails before rendering anything when the template has no background,
    /// the background cannot be decoded or there are no rows.
    pub fn generate<F>(&self, template: &Template, rows: &[DataRow], mut on_progress: F) -> Result<BatchReport>
    where
        F: FnMut(Progress),
    {
        if template.background_image.as_deref().map_or(true, str::is_empty) {
            return Err(AppError::missing_background());
        }
        if rows.is_empty() {
            return Err(AppError::NoRows);
        }
        let background = self.compositor.load_background(template)?;

        let total = rows.len();
        let batch_millis = self.started_at.timestamp_millis();
        info!(template = %template.id, rows = total, "starting batch");

        let mut report = BatchReport {
            results: Vec::with_capacity(total),
            total,
            failure: None,
            cancelled: false,
        };

        for (index, row) in rows.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(completed = index, total, "batch cancelled");
                report.cancelled = true;
                break;
            }

            let payload = verification_payload(&self.qr_prefix, index, batch_millis);
            let ctx = RenderContext {
                today: self.today,
                date_format: &self.date_format,
                qr_payload: &payload,
            };

            match self.render_row(&background, template, row, index, &ctx) {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    warn!(row = index, error = %e, "row failed, stopping batch");
                    report.failure = Some(BatchFailure {
                        row_index: index,
                        reason: e.to_string(),
                    });
                    break;
                }
            }

            on_progress(Progress {
                completed: index + 1,
                total,
            });
        }

        info!(
            generated = report.results.len(),
            total,
            failed = report.failure.is_some(),
            "batch finished"
        );
        Ok(report)
    }

    /// Render row `index` alone, without producing a result. With no rows
    /// at all the template is shown with its defaults and placeholders.
    pub fn preview(&self, template: &Template, rows: &[DataRow], index: usize) -> Result<Composite> {
        let empty = DataRow::new();
        let row = if rows.is_empty() && index == 0 {
            &empty
        } else {
            rows.get(index).ok_or_else(|| {
                AppError::Input(format!("row {} out of range ({} rows)", index + 1, rows.len()))
            })?
        };
        let payload = verification_payload(&self.qr_prefix, index, self.started_at.timestamp_millis());
        let ctx = RenderContext {
            today: self.today,
            date_format: &self.date_format,
            qr_payload: &payload,
        };
        debug!(template = %template.id, row = index, "rendering preview");
        self.compositor.compose(template, row, &ctx)
    }

    fn render_row(
        &self,
        background: &image::DynamicImage,
        template: &Template,
        row: &DataRow,
        index: usize,
        ctx: &RenderContext<'_>,
    ) -> Result<GeneratedResult> {
        let composite = self.compositor.compose_on(background, template, row, ctx);
        let png = self.encoder.encode(&composite.image)?;
        let (verification_id, qr_png) = match composite.qr {
            Some((payload, raster)) => (Some(payload), Some(self.encoder.encode(&raster)?)),
            None => (None, None),
        };
        let name = result_name(template, row, index);
        debug!(row = index, %name, bytes = png.len(), "rendered row");

        Ok(GeneratedResult {
            id: Uuid::new_v4().to_string(),
            name,
            row_index: index,
            png,
            verification_id,
            qr_png,
            created_at: self.started_at,
        })
    }
}

/// Value of the template's first text field in `row`, or `Asset_<n>`.
pub fn result_name(template: &Template, row: &DataRow, index: usize) -> String {
    template
        .name_field()
        .and_then(|f| row.get(&f.id))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}{}", SYNTHETIC_NAME_PREFIX, index + 1))
}
