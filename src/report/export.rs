use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::util::ensure_directory;

use super::tables::{ENTITY_COLUMNS, EntityRecord, SUMMARY_COLUMNS, SummaryRow};

pub fn write_detail_csv(path: &Path, records: &[EntityRecord]) -> Result<()> {
    let mut writer = csv_writer(path)?;
    writer
        .write_record(ENTITY_COLUMNS)
        .with_context(|| format!("failed to write header: {}", path.display()))?;
    for record in records {
        write_cells(&mut writer, &record.to_cells(), path)?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush CSV file: {}", path.display()))
}

pub fn write_summary_csv(path: &Path, summary: Option<&SummaryRow>) -> Result<()> {
    let mut writer = csv_writer(path)?;
    writer
        .write_record(SUMMARY_COLUMNS)
        .with_context(|| format!("failed to write header: {}", path.display()))?;
    if let Some(summary) = summary {
        write_cells(&mut writer, &summary.to_cells(), path)?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush CSV file: {}", path.display()))
}

pub fn read_detail_csv(path: &Path) -> Result<Vec<EntityRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let header = reader
        .headers()
        .with_context(|| format!("failed to read CSV header: {}", path.display()))?;
    if header.get(0) != Some(ENTITY_COLUMNS[0]) {
        bail!("unexpected detail export header in {}", path.display());
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("failed to parse {}", path.display()))?;
        let cells = row.iter().map(str::to_string).collect::<Vec<String>>();
        records.push(EntityRecord::from_cells(&cells).0);
    }
    Ok(records)
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    csv::Writer::from_path(path)
        .with_context(|| format!("failed to create CSV file: {}", path.display()))
}

fn write_cells(writer: &mut csv::Writer<File>, cells: &[Option<&str>], path: &Path) -> Result<()> {
    writer
        .write_record(cells.iter().map(|cell| cell.unwrap_or_default()))
        .with_context(|| format!("failed to write row: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn record(name: &str, share: &str) -> EntityRecord {
        EntityRecord {
            name: name.to_string(),
            revenue_index_group: Some("1.05".to_string()),
            share_group: Some(share.to_string()),
            margin_group: Some("55.0%".to_string()),
            ..EntityRecord::default()
        }
    }

    #[test]
    fn detail_export_round_trips_names_and_row_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("detail_table.csv");
        let records = vec![
            record("AAIKO", "0.8%"),
            record("HARPER & YVE", "1,2%"),
            record("Quote \"Co\"", "2.0%"),
            record("Line\nBreak", "0.1%"),
        ];

        write_detail_csv(&path, &records).expect("write export");
        let loaded = read_detail_csv(&path).expect("read export");

        assert_eq!(loaded.len(), records.len());
        let names = loaded
            .iter()
            .map(|record| record.name.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(
            names,
            vec!["AAIKO", "HARPER & YVE", "Quote \"Co\"", "Line\nBreak"]
        );
        assert_eq!(loaded[1].share_group.as_deref(), Some("1,2%"));
        assert_eq!(loaded[0].rotation_group, None);
    }

    #[test]
    fn empty_detail_export_has_only_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("detail_table.csv");

        write_detail_csv(&path, &[]).expect("write export");
        let raw = fs::read_to_string(&path).expect("read raw");
        assert_eq!(raw.lines().count(), 1);
        assert!(read_detail_csv(&path).expect("read export").is_empty());
    }

    #[test]
    fn summary_export_writes_header_and_optional_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("summary_table.csv");

        write_summary_csv(&path, None).expect("write empty summary");
        assert_eq!(fs::read_to_string(&path).expect("read").lines().count(), 1);

        let summary = SummaryRow {
            revenue_index_group: Some("0.98".to_string()),
            ..SummaryRow::default()
        };
        write_summary_csv(&path, Some(&summary)).expect("write summary");
        let raw = fs::read_to_string(&path).expect("read");
        assert_eq!(raw.lines().nth(1), Some(",0.98,,,,,,,,"));
    }

    #[test]
    fn foreign_header_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("detail_table.csv");
        fs::write(&path, "brand,index\nAAIKO,1.0\n").expect("write");

        assert!(read_detail_csv(&path).is_err());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("detail_table.csv");
        let mut raw = ENTITY_COLUMNS.join(",");
        raw.push_str("\nAAIKO,1.0\n");
        fs::write(&path, raw).expect("write");

        assert!(read_detail_csv(&path).is_err());
    }
}
