use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::DatasetError;

/// Number of data rows quoted back to the agent as a sample.
const SAMPLE_ROWS: usize = 5;

/// A CSV dataset loaded once at startup and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    columns: Vec<String>,
    row_count: usize,
    sample: Vec<String>,
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    pub(crate) fn parse(path: &Path, text: &str) -> Result<Self, DatasetError> {
        let mut records = split_records(text)
            .into_iter()
            .filter(|r| !r.trim().is_empty());
        let header = records
            .next()
            .ok_or_else(|| DatasetError::Empty(path.to_path_buf()))?;
        let columns = split_record(header);

        let mut row_count = 0;
        let mut sample = Vec::with_capacity(SAMPLE_ROWS);
        for record in records {
            if sample.len() < SAMPLE_ROWS {
                sample.push(record.to_string());
            }
            row_count += 1;
        }

        Ok(Self {
            path: path.to_path_buf(),
            columns,
            row_count,
            sample,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Plain-text description handed to agents as dataset context.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "File: {}", self.path.display());
        let _ = writeln!(out, "Rows: {}", self.row_count);
        let _ = writeln!(out, "Columns: {}", self.columns.join(", "));
        if !self.sample.is_empty() {
            let _ = writeln!(out, "First rows:");
            let _ = writeln!(out, "{}", self.columns.join(","));
            for row in &self.sample {
                let _ = writeln!(out, "{row}");
            }
        }
        out
    }
}

/// Splits CSV text into records. Newlines inside double quotes belong to the field.
fn split_records(text: &str) -> Vec<&str> {
    let mut records = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'"' => quoted = !quoted,
            b'\n' if !quoted => {
                records.push(text[start..i].trim_end_matches('\r'));
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < text.len() {
        records.push(text[start..].trim_end_matches('\r'));
    }
    records
}

/// Splits one CSV record on commas, honouring double-quoted fields.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
