use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{IvyError, Result};
use crate::models::RawRow;

/// A parsed export file: normalized header plus raw string rows, in file
/// order.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl ParsedSource {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

/// Lower-case a source column name and replace whitespace runs with
/// underscores: "Transaction ID" -> "transaction_id".
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Strip exactly one layer of surrounding double quotes from a physical
/// line. The export tool wraps every line, header included, in one
/// redundant pair of quotes.
fn dequote_line(line: &str) -> &str {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.len() >= 2 && line.starts_with('"') && line.ends_with('"') {
        &line[1..line.len() - 1]
    } else {
        line
    }
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

pub fn parse_file(file_path: &Path) -> Result<ParsedSource> {
    let content = std::fs::read_to_string(file_path)?;
    parse_str(&content)
}

pub fn parse_str(content: &str) -> Result<ParsedSource> {
    // The first physical line is the header; the csv reader below skips
    // blank lines, so an empty header has to be caught here.
    match content.lines().next() {
        None => return Err(IvyError::MalformedInput("input is empty".to_string())),
        Some(first) if dequote_line(first).trim().is_empty() => {
            return Err(IvyError::MalformedInput("header row is empty".to_string()));
        }
        Some(_) => {}
    }

    // De-quote first, then let the csv reader do the splitting. Quoting is
    // disabled: after the outer pair is removed the fields are plain
    // comma-separated text, and interior quotes are data.
    let cleaned: String = content
        .lines()
        .map(dequote_line)
        .collect::<Vec<_>>()
        .join("\n");

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(cleaned.as_bytes());

    let mut records = rdr.records();

    let header: Vec<String> = match records.next() {
        None => return Err(IvyError::MalformedInput("input is empty".to_string())),
        Some(result) => {
            let record = result?;
            let fields: Vec<String> = record.iter().map(|f| f.trim().to_string()).collect();
            if fields.iter().all(|f| f.is_empty()) {
                return Err(IvyError::MalformedInput("header row is empty".to_string()));
            }
            fields.iter().map(|f| normalize_column_name(f)).collect()
        }
    };

    let mut rows = Vec::new();

    for (idx, result) in records.enumerate() {
        let record = result?;
        let line_number = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        let fields: Vec<String> = record.iter().map(|f| f.trim().to_string()).collect();

        // Skip fully blank lines.
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }

        // The export pads some rows with trailing commas; surplus fields are
        // tolerated only when all of them are empty.
        let mut fields = fields;
        while fields.len() > header.len() && fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        if fields.len() != header.len() {
            return Err(IvyError::MalformedInput(format!(
                "line {line_number}: expected {} fields, found {}",
                header.len(),
                fields.len()
            )));
        }

        rows.push(RawRow {
            line_number,
            values: fields,
        });
    }

    Ok(ParsedSource { header, rows })
}
