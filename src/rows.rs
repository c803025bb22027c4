//! Builds data rows from per-field bulk input.
//!
//! Each field gets its own list of candidate values. Lists of different
//! lengths are aligned by cycling: row `i` takes `values[i % len]`, and the
//! longest list decides how many rows there are.

use crate::decode::file_to_data_url;
use crate::error::{AppError, Result};
use crate::model::{DataRow, Template};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Split bulk text on newlines, commas or semicolons, trimming each token
/// and dropping empty ones.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(['\n', '\r', ',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Candidate values gathered per field before rows are built.
#[derive(Debug, Clone, Default)]
pub struct RowBuilder {
    candidates: BTreeMap<String, Vec<String>>,
}

impl RowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add tokens from bulk text (typed or read from a .txt/.csv file).
    pub fn add_text(&mut self, field_id: &str, text: &str) -> &mut Self {
        self.entry(field_id).extend(tokenize(text));
        self
    }

    pub fn add_text_file(&mut self, field_id: &str, path: &Path) -> Result<&mut Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Input(format!("{}: {}", path.display(), e)))?;
        Ok(self.add_text(field_id, &content))
    }

    /// Add image references as-is (data URLs, paths or URLs).
    pub fn add_images<I, S>(&mut self, field_id: &str, references: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry(field_id).extend(references.into_iter().map(Into::into));
        self
    }

    /// Read image files and add them as data URLs, in the given order.
    pub fn add_image_files<P: AsRef<Path>>(&mut self, field_id: &str, paths: &[P]) -> Result<&mut Self> {
        let urls = paths
            .iter()
            .map(|p| file_to_data_url(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.add_images(field_id, urls))
    }

    pub fn count(&self, field_id: &str) -> usize {
        self.candidates.get(field_id).map_or(0, Vec::len)
    }

    /// Number of rows `build` will produce.
    pub fn row_count(&self) -> usize {
        self.candidates.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Rows for every candidate list, cycling shorter lists.
    pub fn build(&self) -> Vec<DataRow> {
        let total = self.row_count();
        (0..total)
            .map(|i| {
                let mut row = DataRow::new();
                for (field_id, values) in &self.candidates {
                    if !values.is_empty() {
                        row.insert(field_id.clone(), values[i % values.len()].clone());
                    }
                }
                row
            })
            .collect()
    }

    /// Rows for `template`: rejects inputs aimed at unknown fields or at
    /// fields that do not take input (QR codes are generated).
    pub fn build_for(&self, template: &Template) -> Result<Vec<DataRow>> {
        for field_id in self.candidates.keys() {
            let field = template
                .field(field_id)
                .ok_or_else(|| AppError::Input(format!("template has no field '{}'", field_id)))?;
            if !field.takes_input() {
                return Err(AppError::Input(format!(
                    "field '{}' is a {:?} field and takes no input",
                    field_id,
                    field.kind()
                )));
            }
        }
        let rows = self.build();
        debug!(rows = rows.len(), fields = self.candidates.len(), "built data rows");
        Ok(rows)
    }

    fn entry(&mut self, field_id: &str) -> &mut Vec<String> {
        self.candidates.entry(field_id.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldBody, FieldKind, TemplateKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn tokenizes_on_all_separators() {
        assert_eq!(tokenize("Ann, Bo;\nCara"), vec!["Ann", "Bo", "Cara"]);
        assert_eq!(tokenize("  ,;\n\n "), Vec::<String>::new());
        assert_eq!(tokenize("Ann\r\nBo\r\n"), vec!["Ann", "Bo"]);
    }

    #[test]
    fn tokenizing_rejoined_output_is_stable() {
        let first = tokenize("Ann, Bo;\nCara");
        let again = tokenize(&first.join("\n"));
        assert_eq!(first, again);
    }

    #[test]
    fn shorter_lists_cycle() {
        let mut builder = RowBuilder::new();
        builder.add_text("name", "Ann\nBo");
        builder.add_images("photo", (1..=5).map(|i| format!("photo{}.png", i)));
        let rows = builder.build();

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2].get("name"), Some("Ann"));
        assert_eq!(rows[3].get("name"), Some("Bo"));
        assert_eq!(rows[4].get("photo"), Some("photo5.png"));
    }

    #[test]
    fn no_candidates_means_no_rows() {
        let mut builder = RowBuilder::new();
        builder.add_text("name", " , ;");
        assert_eq!(builder.row_count(), 0);
        assert!(builder.build().is_empty());
    }

    #[test]
    fn empty_list_leaves_field_unset() {
        let mut builder = RowBuilder::new();
        builder.add_text("name", "Ann,Bo").add_text("title", "");
        let rows = builder.build();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("title"), None);
    }

    #[test]
    fn inputs_for_qr_fields_are_rejected() {
        let mut template = Template::new(TemplateKind::Badge, "t");
        template.fields.push(crate::model::Field {
            id: "qr".to_string(),
            name: "QR Code".to_string(),
            required: false,
            position: crate::model::Position { x: 0.0, y: 0.0 },
            default_value: None,
            body: FieldBody::defaults_for(FieldKind::Qr),
        });

        let mut builder = RowBuilder::new();
        builder.add_text("qr", "abc");
        assert!(matches!(builder.build_for(&template), Err(AppError::Input(_))));

        let mut builder = RowBuilder::new();
        builder.add_text("nope", "abc");
        assert!(matches!(builder.build_for(&template), Err(AppError::Input(_))));

        let mut builder = RowBuilder::new();
        builder.add_text("name", "Ann");
        assert_eq!(builder.build_for(&template).unwrap().len(), 1);
    }

    #[test]
    fn text_file_uses_same_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.csv");
        std::fs::write(&path, "Ann,Bo\nCara;Dee\n").unwrap();
        let mut builder = RowBuilder::new();
        builder.add_text_file("name", &path).unwrap();
        assert_eq!(builder.count("name"), 4);
    }
}
