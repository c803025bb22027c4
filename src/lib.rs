//! massgen: bulk generation of certificates, badges and cards from a
//! background image, positioned fields and per-recipient data.

pub mod batch;
pub mod canvas;
pub mod color;
pub mod compositor;
pub mod config;
pub mod decode;
pub mod editor;
pub mod error;
pub mod export;
pub mod model;
pub mod qr;
pub mod render;
pub mod rows;
pub mod store;
pub mod text;

pub use batch::{BatchFailure, BatchGenerator, BatchReport, CancelFlag, Progress};
pub use compositor::{Composite, Compositor};
pub use config::GeneratorConfig;
pub use decode::{DefaultDecoder, ImageDecoder, ImageEncoder, PngEncoder};
pub use editor::FieldPatch;
pub use error::{AppError, Result};
pub use export::{package, ExportArtifact};
pub use model::{AssetBatch, DataRow, Field, FieldBody, FieldKind, GeneratedResult, Template, TemplateKind};
pub use rows::RowBuilder;
pub use store::{BatchStore, FileRepository, MemoryRepository, Repository, TemplateStore};
