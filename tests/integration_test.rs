use image::{Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::process::{Command, Output};

fn cargo_bin(store: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_massgen"));
    cmd.arg("--store").arg(store);
    cmd
}

fn run(store: &Path, args: &[&str]) -> Output {
    cargo_bin(store)
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
        .save(path)
        .expect("Failed to write test image");
}

/// Create a template with a 400x300 background and return its id.
fn create_template(dir: &Path, store: &Path) -> String {
    let output = run(store, &["new", "-n", "Course Certificate", "-k", "certificate"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let text = stdout(&output);
    let id = text
        .lines()
        .find_map(|l| l.strip_prefix("✓ Created: "))
        .expect("template id in output")
        .trim()
        .to_string();

    let bg = dir.join("background.png");
    write_png(&bg, 400, 300, [255, 255, 255, 255]);
    let output = run(store, &["background", &id, bg.to_str().unwrap()]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).contains("400x300"));

    let output = run(store, &["move-field", &id, "name", "200", "150"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    id
}

#[test]
fn test_new_template_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");

    let output = run(&store, &["new", "-n", "Speaker Badge", "-k", "badge"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).contains("Canvas: 800x800"));

    let output = run(&store, &["list"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Speaker Badge"));
    assert!(text.contains("no background"));
    assert!(store.join("massgen_templates.json").exists());
}

#[test]
fn test_generate_archive_for_several_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    let out = dir.path().join("out");
    let id = create_template(dir.path(), &store);

    let output = run(
        &store,
        &[
            "generate",
            &id,
            "--text",
            "name=Ann, Bo; Cara",
            "-o",
            out.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).contains("Assets: 3"));

    let archives: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().map_or(false, |e| e == "zip"))
        .collect();
    assert_eq!(archives.len(), 1, "expected one archive in {:?}", out);

    let bytes = fs::read(&archives[0]).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 3);
    assert!(archive.by_name("Bo.png").is_ok());

    let output = run(&store, &["batches"]);
    assert!(stdout(&output).contains("3 assets"));
}

#[test]
fn test_single_row_exports_png() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    let out = dir.path().join("out");
    let id = create_template(dir.path(), &store);

    let output = run(
        &store,
        &["generate", &id, "--text", "name=Ann Lee", "--no-save", "-o", out.to_str().unwrap()],
    );
    assert!(output.status.success(), "Command failed: {:?}", output);

    let png = out.join("Ann Lee.png");
    assert!(png.exists(), "PNG file was not created");
    let img = image::open(&png).unwrap();
    assert_eq!((img.width(), img.height()), (400, 300));

    // --no-save leaves no batch behind
    let output = run(&store, &["batches"]);
    assert!(stdout(&output).contains("No batches"));
}

#[test]
fn test_photos_cycle_with_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    let out = dir.path().join("out");
    let id = create_template(dir.path(), &store);

    let output = run(&store, &["add-field", &id, "-k", "image", "--x", "200", "--y", "80"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let field = stdout(&output)
        .lines()
        .find_map(|l| l.strip_prefix("✓ Added field: ").map(str::to_string))
        .unwrap();

    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    write_png(&a, 10, 10, [255, 0, 0, 255]);
    write_png(&b, 10, 10, [0, 0, 255, 255]);

    let images = format!("{}={},{}", field, a.display(), b.display());
    let output = run(
        &store,
        &["generate", &id, "--text", "name=Ann", "--images", &images, "-o", out.to_str().unwrap()],
    );
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).contains("Assets: 2"));
}

#[test]
fn test_generate_without_background_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");

    let output = run(&store, &["new", "-n", "Bare"]);
    let id = stdout(&output)
        .lines()
        .find_map(|l| l.strip_prefix("✓ Created: ").map(str::to_string))
        .unwrap();

    let output = run(&store, &["generate", &id, "--text", "name=Ann"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("background image is not set"), "stderr: {}", stderr);
}

#[test]
fn test_generate_without_rows_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    let id = create_template(dir.path(), &store);

    let output = run(&store, &["generate", &id, "--text", "name= , ;"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No data rows"));
}

#[test]
fn test_preview_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    let id = create_template(dir.path(), &store);
    let file = dir.path().join("preview.png");

    let output = run(
        &store,
        &["preview", &id, "--text", "name=Ann,Bo", "--row", "2", "-o", file.to_str().unwrap()],
    );
    assert!(output.status.success(), "Command failed: {:?}", output);
    let img = image::open(&file).unwrap();
    assert_eq!((img.width(), img.height()), (400, 300));
}

#[test]
fn test_export_and_delete_batch() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    let out = dir.path().join("out");
    let id = create_template(dir.path(), &store);

    let output = run(&store, &["generate", &id, "--text", "name=Ann,Bo", "-o", out.to_str().unwrap()]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let batch = stdout(&output)
        .lines()
        .find_map(|l| l.trim().strip_prefix("Batch ID: ").map(str::to_string))
        .unwrap();

    // Template deletion keeps the batch
    assert!(run(&store, &["delete", &id]).status.success());

    let again = dir.path().join("again");
    let output = run(&store, &["export", &batch, "-o", again.to_str().unwrap()]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_eq!(fs::read_dir(&again).unwrap().count(), 1);

    assert!(run(&store, &["delete-batch", &batch]).status.success());
    let output = run(&store, &["export", &batch]);
    assert!(!output.status.success());
}
