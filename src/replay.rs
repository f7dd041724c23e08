//! Recorded position fixes for simulated walks.
//!
//! A fix log is either a JSON array of fixes or one JSON fix per line,
//! optionally gzip-compressed (`.gz`).

use anyhow::Context;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{NavError, NavResult};
use crate::types::Fix;

pub fn parse_fixes(text: &str) -> NavResult<Vec<Fix>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| NavError::Parse(format!("line {}: {}", i + 1, e)))
        })
        .collect()
}

pub fn load_fixes(path: &Path) -> anyhow::Result<Vec<Fix>> {
    let file = File::open(path).with_context(|| format!("opening fix log {}", path.display()))?;
    let mut text = String::new();
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        GzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        BufReader::new(file).read_to_string(&mut text)?;
    }
    Ok(parse_fixes(&text)?)
}
