// massgen: Generate certificates, badges and cards in bulk from a template

use chrono::Local;
use clap::{Parser, Subcommand};
use massgen::decode::file_to_data_url;
use massgen::editor::FieldPatch;
use massgen::model::{FieldKind, Size, TextAlign, TextStyle};
use massgen::{
    package, AppError, AssetBatch, BatchGenerator, BatchStore, DataRow, DefaultDecoder, FileRepository,
    GeneratorConfig, RowBuilder, Template, TemplateKind, TemplateStore,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Generate certificates, badges and cards in bulk")]
struct Args {
    /// Directory holding saved templates and batches
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a template from a preset
    New {
        /// Template name
        #[arg(short, long)]
        name: String,

        /// Preset canvas
        #[arg(short, long, value_enum, default_value = "certificate")]
        kind: TemplateKind,

        /// Short description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List saved templates
    List,

    /// Print a template as JSON
    Show { template: String },

    /// Set a template's background image (file path or URL)
    Background { template: String, image: String },

    /// Add a field to a template
    AddField {
        template: String,

        /// Field type
        #[arg(short, long, value_enum)]
        kind: FieldKind,

        /// Display name (defaults by type)
        #[arg(short, long)]
        name: Option<String>,

        /// Center x in pixels (defaults to canvas center)
        #[arg(long)]
        x: Option<f32>,

        /// Center y in pixels (defaults to canvas center)
        #[arg(long)]
        y: Option<f32>,

        /// Width for image and QR fields
        #[arg(long)]
        width: Option<u32>,

        /// Height for image and QR fields
        #[arg(long)]
        height: Option<u32>,

        /// Font size for text and date fields
        #[arg(long)]
        font_size: Option<f32>,

        /// Text color (#rrggbb)
        #[arg(long)]
        color: Option<String>,

        /// Text alignment
        #[arg(long, value_enum)]
        align: Option<TextAlign>,

        /// Bold text
        #[arg(long)]
        bold: bool,

        /// Value used when a row has none
        #[arg(long)]
        default: Option<String>,

        /// Mark the field optional
        #[arg(long)]
        optional: bool,
    },

    /// Remove a field from a template
    RemoveField { template: String, field: String },

    /// Move a field (clamped to the canvas)
    MoveField {
        template: String,
        field: String,
        x: f32,
        y: f32,
    },

    /// Delete a template (its batches are kept)
    Delete { template: String },

    /// Generate one asset per data row and export them
    Generate {
        template: String,

        #[command(flatten)]
        inputs: RowInputs,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Do not record the batch in the store
        #[arg(long)]
        no_save: bool,
    },

    /// Render a single row to a PNG
    Preview {
        template: String,

        #[command(flatten)]
        inputs: RowInputs,

        /// Row to render (1-based)
        #[arg(short, long, default_value = "1")]
        row: usize,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List saved batches, newest first
    Batches,

    /// Export a saved batch again
    Export {
        batch: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Delete a saved batch
    DeleteBatch { batch: String },
}

/// Per-field bulk input
#[derive(clap::Args, Debug, Default)]
struct RowInputs {
    /// Values for a field, separated by newlines, commas or semicolons (FIELD=VALUES)
    #[arg(long, value_parser = parse_assignment)]
    text: Vec<(String, String)>,

    /// Read values for a field from a .txt or .csv file (FIELD=PATH)
    #[arg(long, value_parser = parse_assignment)]
    text_file: Vec<(String, String)>,

    /// Image files for a field, comma separated (FIELD=PATH,PATH,...)
    #[arg(long, value_parser = parse_assignment)]
    images: Vec<(String, String)>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    // Settings file first, then command-line overrides
    let mut config = GeneratorConfig::load(args.config.as_deref())?;
    if let Some(store) = args.store {
        config.store_dir = store;
    }

    let repo = FileRepository::new(&config.store_dir);
    let templates = TemplateStore::new(&repo);
    let batches = BatchStore::new(&repo);

    match args.command {
        Command::New {
            name,
            kind,
            description,
        } => {
            let mut template = Template::new(kind, name);
            template.description = description;
            templates.add(template.clone())?;
            println!("✓ Created: {}", template.id);
            println!("  Name: {}", template.name);
            println!("  Type: {}", kind.label());
            println!("  Canvas: {}x{}", template.canvas.width, template.canvas.height);
        }
        Command::List => {
            let all = templates.list()?;
            if all.is_empty() {
                println!("No templates");
            }
            for t in all {
                println!(
                    "{}  {}  [{}] {}x{}, {} fields{}",
                    t.id,
                    t.name,
                    t.kind.label(),
                    t.canvas.width,
                    t.canvas.height,
                    t.fields.len(),
                    if t.background_image.is_some() { "" } else { ", no background" }
                );
            }
        }
        Command::Show { template } => {
            let t = templates.get(&template)?;
            println!("{}", serde_json::to_string_pretty(&t)?);
        }
        Command::Background { template, image } => {
            let mut t = templates.get(&template)?;
            let canvas = t.set_background(load_image_reference(&image)?, &DefaultDecoder)?;
            templates.update(t)?;
            println!("✓ Background set: {}x{}", canvas.width, canvas.height);
        }
        Command::AddField {
            template,
            kind,
            name,
            x,
            y,
            width,
            height,
            font_size,
            color,
            align,
            bold,
            default,
            optional,
        } => {
            let mut t = templates.get(&template)?;
            let field_id = t.add_field(kind);

            let mut patch = FieldPatch {
                name,
                default_value: default,
                ..FieldPatch::default()
            };
            if optional {
                patch.required = Some(false);
            }
            if matches!(kind, FieldKind::Image | FieldKind::Qr) && (width.is_some() || height.is_some()) {
                let side = width.or(height).unwrap_or(massgen::model::DEFAULT_FIELD_SIZE);
                patch.size = Some(Size {
                    width: width.unwrap_or(side),
                    height: height.unwrap_or(side),
                });
            }
            if matches!(kind, FieldKind::Text | FieldKind::Date)
                && (font_size.is_some() || color.is_some() || align.is_some() || bold)
            {
                let mut style = if kind == FieldKind::Date {
                    TextStyle::for_date()
                } else {
                    TextStyle::for_text()
                };
                if let Some(size) = font_size {
                    style.font_size = size;
                }
                if let Some(color) = color {
                    style.color = color;
                }
                if let Some(align) = align {
                    style.text_align = align;
                }
                style.bold = bold;
                patch.style = Some(style);
            }
            t.update_field(&field_id, patch)?;

            if x.is_some() || y.is_some() {
                let current = t.field(&field_id).map(|f| f.position);
                let (cx, cy) = current.map_or((0.0, 0.0), |p| (p.x, p.y));
                t.move_field(&field_id, x.unwrap_or(cx), y.unwrap_or(cy))?;
            }
            templates.update(t)?;
            println!("✓ Added field: {}", field_id);
        }
        Command::RemoveField { template, field } => {
            let mut t = templates.get(&template)?;
            t.remove_field(&field)?;
            templates.update(t)?;
            println!("✓ Removed field: {}", field);
        }
        Command::MoveField { template, field, x, y } => {
            let mut t = templates.get(&template)?;
            let pos = t.move_field(&field, x, y)?;
            templates.update(t)?;
            println!("✓ Moved {} to ({}, {})", field, pos.x, pos.y);
        }
        Command::Delete { template } => {
            templates.delete(&template)?;
            println!("✓ Deleted template: {}", template);
        }
        Command::Generate {
            template,
            inputs,
            output,
            no_save,
        } => {
            let t = templates.get(&template)?;
            let rows = build_rows(&t, &inputs)?;
            generate(&t, &rows, &config, &output, if no_save { None } else { Some(&batches) })?;
        }
        Command::Preview {
            template,
            inputs,
            row,
            output,
        } => {
            let t = templates.get(&template)?;
            let rows = build_rows(&t, &inputs)?;
            let generator = BatchGenerator::new(&DefaultDecoder, &config);
            let composite = generator.preview(&t, &rows, row.saturating_sub(1))?;
            let png = massgen::decode::encode_png(&composite.image)?;
            write_file(&output, &png)?;
            println!("✓ Generated: {}", output.display());
        }
        Command::Batches => {
            let all = batches.list()?;
            if all.is_empty() {
                println!("No batches");
            }
            for b in all {
                println!(
                    "{}  {}  {} assets  {}",
                    b.id,
                    b.template_name,
                    b.assets.len(),
                    b.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Export { batch, output } => {
            let b = batches.get(&batch)?;
            let artifact = package(&b.assets, &config.archive_prefix, Local::now())?;
            let path = artifact.write_into(&output)?;
            println!("✓ Generated: {}", path.display());
        }
        Command::DeleteBatch { batch } => {
            batches.delete(&batch)?;
            println!("✓ Deleted batch: {}", batch);
        }
    }

    Ok(())
}

// ============================================================================
// Generation
// ============================================================================

fn generate(
    template: &Template,
    rows: &[DataRow],
    config: &GeneratorConfig,
    output: &Path,
    batches: Option<&BatchStore<'_>>,
) -> Result<(), AppError> {
    let generator = BatchGenerator::new(&DefaultDecoder, config);
    let report = generator.generate(template, rows, |p| {
        eprint!("\r  Generating {}/{} ({:.0}%)", p.completed, p.total, p.percent());
        std::io::stderr().flush().ok();
    })?;
    eprintln!();

    if let Some(failure) = &report.failure {
        eprintln!(
            "⚠ Stopped at row {}: {} ({} of {} generated)",
            failure.row_index + 1,
            failure.reason,
            report.results.len(),
            report.total
        );
    }
    if report.results.is_empty() {
        return Err(AppError::Export("no assets were generated".to_string()));
    }

    let artifact = package(&report.results, &config.archive_prefix, Local::now())?;
    let path = artifact.write_into(output)?;

    let count = report.results.len();
    let batch = AssetBatch::new(template, report.results);
    let batch_id = batch.id.clone();
    if let Some(store) = batches {
        store.add(batch)?;
        info!(batch = %batch_id, "batch saved");
    }

    println!("✓ Generated: {}", path.display());
    println!("  Template: {}", template.name);
    println!("  Assets: {}", count);
    if batches.is_some() {
        println!("  Batch ID: {}", batch_id);
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", s))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field id in '{}'", s));
    }
    Ok((field.to_string(), value.to_string()))
}

fn build_rows(template: &Template, inputs: &RowInputs) -> Result<Vec<DataRow>, AppError> {
    let mut builder = RowBuilder::new();
    for (field, values) in &inputs.text {
        builder.add_text(field, values);
    }
    for (field, path) in &inputs.text_file {
        builder.add_text_file(field, Path::new(path))?;
    }
    for (field, paths) in &inputs.images {
        let paths: Vec<&str> = paths.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
        builder.add_image_files(field, &paths)?;
    }
    builder.build_for(template)
}

/// URLs and data URLs are stored as given; files are embedded so the
/// template stays usable if the file moves.
fn load_image_reference(image: &str) -> Result<String, AppError> {
    if image.starts_with("data:") || image.starts_with("http://") || image.starts_with("https://") {
        Ok(image.to_string())
    } else {
        file_to_data_url(Path::new(image))
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}
