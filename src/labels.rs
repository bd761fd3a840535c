//! Label vocabulary: the ordered set of pharmacophore categories.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Pharmacophore categories predicted by the released models, in output order.
pub const PHARMACOPHORE_CATEGORIES: [&str; 6] = [
    "Aromatic",
    "HydrogenAcceptor",
    "HydrogenDonor",
    "Hydrophobic",
    "NegativeIon",
    "PositiveIon",
];

/// Helper struct for JSON object with "labels" key.
#[derive(serde::Deserialize)]
struct LabelsObject {
    labels: Vec<String>,
}

/// Helper struct for JSON array of objects.
#[derive(serde::Deserialize)]
struct LabelEntry {
    name: Option<String>,
    label: Option<String>,
}

/// Fixed, ordered label names with an index to name bijection.
///
/// The position of a name is the column of the model output it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelVocabulary {
    /// Build a vocabulary from names in model output order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `names` is empty, contains an empty name,
    /// or contains a duplicate.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::Config {
                reason: "label vocabulary is empty".to_string(),
            });
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::Config {
                    reason: format!("label {i} has an empty name"),
                });
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(Error::Config {
                    reason: format!("duplicate label '{name}'"),
                });
            }
        }

        Ok(Self { names, index })
    }

    /// The six pharmacophore categories.
    #[must_use]
    pub fn pharmacophore() -> Self {
        let names: Vec<String> = PHARMACOPHORE_CATEGORIES
            .iter()
            .map(ToString::to_string)
            .collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Load a vocabulary, picking the parser from the file extension
    /// (`.json`, `.csv`, anything else is one label per line).
    ///
    /// # Errors
    ///
    /// Returns [`Error::LabelLoad`] if the file can't be read,
    /// [`Error::LabelParse`] if it can't be parsed and [`Error::Config`]
    /// if the parsed names don't form a valid vocabulary.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::LabelLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let names = match extension.as_deref() {
            Some("json") => parse_json_labels(&content)?,
            Some("csv") => parse_csv_labels(&content)?,
            _ => parse_text_labels(&content),
        };

        Self::new(names)
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed vocabulary.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of the label at `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Output column of the label called `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Names in output order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Iterate over `(index, name)` in output order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self::pharmacophore()
    }
}

/// Parse text format: one label per line.
fn parse_text_labels(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Parse CSV format: first column is label, skip header if detected.
fn parse_csv_labels(content: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut labels = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| Error::LabelParse(e.to_string()))?;
        let Some(first_col) = record.get(0) else {
            continue;
        };
        let label = first_col.trim();
        if row == 0 && looks_like_header(label) {
            continue;
        }
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    Ok(labels)
}

fn looks_like_header(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "label" | "name" | "category" | "feature" | "class"
    )
}

/// Parse JSON format: `["a", ...]`, `{"labels": [...]}` or `[{"name": "a"}, ...]`.
fn parse_json_labels(content: &str) -> Result<Vec<String>> {
    if let Ok(labels) = serde_json::from_str::<Vec<String>>(content) {
        return Ok(labels);
    }

    if let Ok(obj) = serde_json::from_str::<LabelsObject>(content) {
        return Ok(obj.labels);
    }

    if let Ok(entries) = serde_json::from_str::<Vec<LabelEntry>>(content) {
        let labels: Vec<String> = entries
            .into_iter()
            .filter_map(|e| e.name.or(e.label))
            .collect();
        if !labels.is_empty() {
            return Ok(labels);
        }
    }

    Err(Error::LabelParse(
        "unrecognized JSON format: expected array of strings, {labels: [...]}, or [{name: ...}]"
            .to_string(),
    ))
}
