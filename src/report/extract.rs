use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::ExtractionMarkers;

use super::source::{RawDocument, RawTable};
use super::tables::{ENTITY_COLUMNS, EntityRecord, RowShape, SUMMARY_COLUMNS, SummaryRow};

const SUMMARY_MIN_ROW_WIDTH: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct ExtractedTables {
    pub summary: Option<SummaryRow>,
    pub entities: Vec<EntityRecord>,
    pub short_rows: usize,
    pub overlong_rows: usize,
    pub warnings: Vec<String>,
}

pub struct TableExtractor {
    decimal: Regex,
    markers: ExtractionMarkers,
}

impl TableExtractor {
    pub fn new(markers: ExtractionMarkers) -> Result<Self> {
        Ok(Self {
            decimal: Regex::new(r"\d+\.\d+").context("failed to compile decimal regex")?,
            markers,
        })
    }

    pub fn extract(&self, document: &RawDocument) -> ExtractedTables {
        let mut extracted = ExtractedTables::default();

        for (page_index, page) in document.pages.iter().enumerate() {
            for table in &page.tables {
                if table.rows.is_empty() {
                    continue;
                }

                if page_index == 0 && extracted.summary.is_none() && self.is_summary_table(table)
                {
                    let summary = self.summary_row(table, &mut extracted);
                    extracted.summary = summary;
                }

                if self.is_entity_table(table) {
                    self.collect_entity_rows(table, &mut extracted);
                }
            }
        }

        if extracted.summary.is_none() {
            warn!(marker = %self.markers.summary_marker, "summary table not found");
            extracted.warnings.push(format!(
                "summary table ('{}') not found on the first page; season aggregates unavailable",
                self.markers.summary_marker
            ));
        }
        if extracted.entities.is_empty() {
            warn!(header = %self.markers.entity_header, "no entity rows found");
            extracted.warnings.push(format!(
                "no entity rows found under a '{}' header",
                self.markers.entity_header
            ));
        }
        if extracted.short_rows > 0 {
            extracted.warnings.push(format!(
                "{} row(s) narrower than the {}-column schema; trailing fields left empty",
                extracted.short_rows,
                ENTITY_COLUMNS.len()
            ));
        }
        if extracted.overlong_rows > 0 {
            extracted.warnings.push(format!(
                "{} row(s) wider than the schema; extra cells ignored",
                extracted.overlong_rows
            ));
        }

        debug!(
            summary_found = extracted.summary.is_some(),
            entities = extracted.entities.len(),
            short_rows = extracted.short_rows,
            "table extraction finished"
        );

        extracted
    }

    fn is_summary_table(&self, table: &RawTable) -> bool {
        table
            .cells()
            .any(|cell| cell.contains(&self.markers.summary_marker))
    }

    fn is_entity_table(&self, table: &RawTable) -> bool {
        table
            .cells()
            .any(|cell| cell.contains(&self.markers.entity_header))
    }

    fn summary_row(&self, table: &RawTable, extracted: &mut ExtractedTables) -> Option<SummaryRow> {
        let row = table.rows.iter().find(|row| {
            row.len() >= SUMMARY_MIN_ROW_WIDTH
                && row
                    .iter()
                    .flatten()
                    .any(|cell| self.decimal.is_match(cell))
        })?;

        let populated = row
            .iter()
            .flatten()
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
            .map(str::to_string)
            .collect::<Vec<String>>();

        let (summary, shape) = SummaryRow::from_cells(&populated);
        match shape {
            RowShape::Short { present, expected } => {
                extracted.warnings.push(format!(
                    "summary row has {present} of {expected} columns; trailing metrics unavailable"
                ));
            }
            RowShape::Overlong { present, .. } => {
                debug!(
                    present,
                    expected = SUMMARY_COLUMNS.len(),
                    "summary row wider than schema"
                );
            }
            RowShape::Complete => {}
        }

        if summary.is_empty() {
            None
        } else {
            Some(summary)
        }
    }

    fn collect_entity_rows(&self, table: &RawTable, extracted: &mut ExtractedTables) {
        let Some(header_index) = table.rows.iter().position(|row| {
            first_cell(row)
                .map(|cell| cell.contains(&self.markers.entity_header))
                .unwrap_or(false)
        }) else {
            return;
        };

        for row in &table.rows[header_index + 1..] {
            let Some(name) = first_cell(row) else {
                continue;
            };
            if self.is_header_label(name) {
                continue;
            }

            let cells = positional_cells(row);
            let (record, shape) = EntityRecord::from_cells(&cells);
            match shape {
                RowShape::Short { .. } => extracted.short_rows += 1,
                RowShape::Overlong { .. } => extracted.overlong_rows += 1,
                RowShape::Complete => {}
            }
            extracted.entities.push(record);
        }
    }

    fn is_header_label(&self, cell: &str) -> bool {
        self.markers
            .header_labels
            .iter()
            .any(|label| cell.contains(label.as_str()))
    }
}

fn first_cell(row: &[Option<String>]) -> Option<&str> {
    row.first()
        .and_then(|cell| cell.as_deref())
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
}

fn positional_cells(row: &[Option<String>]) -> Vec<String> {
    let mut cells = row
        .iter()
        .map(|cell| cell.as_deref().map(str::trim).unwrap_or_default().to_string())
        .collect::<Vec<String>>();
    while cells.last().map(|cell| cell.is_empty()).unwrap_or(false) {
        cells.pop();
    }
    cells
}
