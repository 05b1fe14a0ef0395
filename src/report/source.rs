use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::util::read_json;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub pages: Vec<RawPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    pub tables: Vec<RawTable>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().filter_map(|cell| cell.as_deref()))
    }
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<RawDocument>;
}

pub struct PdfTextLoader {
    cell_split: Regex,
}

impl PdfTextLoader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cell_split: Regex::new(r"\s{2,}").context("failed to compile cell split regex")?,
        })
    }

    fn parse_layout_text(&self, raw: &str) -> RawDocument {
        let mut pages = raw
            .split('\u{000C}')
            .map(|page| page.replace('\u{0000}', ""))
            .collect::<Vec<String>>();

        while let Some(last_page) = pages.last() {
            if last_page.trim().is_empty() {
                pages.pop();
                continue;
            }
            break;
        }

        RawDocument {
            pages: pages
                .iter()
                .map(|page| RawPage {
                    tables: self.split_tables(page),
                })
                .collect(),
        }
    }

    fn split_tables(&self, page: &str) -> Vec<RawTable> {
        let mut tables = Vec::new();
        let mut current = RawTable::default();

        for line in page.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if !current.rows.is_empty() {
                    tables.push(std::mem::take(&mut current));
                }
                continue;
            }

            let cells = self
                .cell_split
                .split(trimmed)
                .map(|cell| Some(cell.to_string()))
                .collect::<Vec<Option<String>>>();
            current.rows.push(cells);
        }

        if !current.rows.is_empty() {
            tables.push(current);
        }

        tables
    }
}

impl DocumentLoader for PdfTextLoader {
    fn load(&self, path: &Path) -> Result<RawDocument> {
        let output = Command::new("pdftotext")
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .with_context(|| format!("failed to execute pdftotext for {}", path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pdftotext returned non-zero exit status for {}: {}",
                path.display(),
                stderr.trim()
            );
        }

        let document = self.parse_layout_text(&String::from_utf8_lossy(&output.stdout));
        debug!(path = %path.display(), pages = document.pages.len(), "loaded pdf text layer");
        Ok(document)
    }
}

pub struct JsonTableLoader;

impl DocumentLoader for JsonTableLoader {
    fn load(&self, path: &Path) -> Result<RawDocument> {
        read_json(path)
    }
}

pub fn loader_for(path: &Path) -> Result<Box<dyn DocumentLoader>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => Ok(Box::new(PdfTextLoader::new()?)),
        "json" => Ok(Box::new(JsonTableLoader)),
        _ => bail!("unsupported source document type: {}", path.display()),
    }
}
