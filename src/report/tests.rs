use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::export::read_detail_csv;
use super::source::{RawDocument, RawPage, RawTable};
use super::template::TemplateDocument;
use super::*;
use crate::config::Configuration;

fn row(values: &[&str]) -> Vec<Option<String>> {
    values
        .iter()
        .map(|value| (!value.is_empty()).then(|| value.to_string()))
        .collect()
}

fn branch_report() -> RawDocument {
    let summary = RawTable {
        rows: vec![
            row(&["Totaal seizoen"]),
            row(&["Omzet index ond", "Omzet index grp", "%Dvk ond", "%Dvk grp"]),
            row(&[
                "1.04", "1.00", "39.0", "40.0", "495", "500", "53.0%", "52.0%", "3.1", "3.0",
            ]),
        ],
    };

    let mut brands = vec![row(&[
        "Merk",
        "Omzet index ond",
        "Omzet index grp",
        "%Dvk ond",
        "%Dvk grp",
        "Rent ond",
        "Rent grp",
        "Aand grp",
        "Marge grp",
        "OS grp",
    ])];
    for values in [
        ["FREEBIRD", "1.2", "1.30", "44", "46.0", "530", "560", "2,0%", "58.0%", "4.2"],
        ["JOSH V", "1.0", "1.10", "40", "41.0", "500", "505", "0,8%", "54.0%", "3.4"],
        ["FABIENNE CHAPOT", "0.9", "0.95", "35", "36.0", "470", "480", "0,6%", "50.0%", "2.9"],
        ["HARPER & YVE", "0.8", "0.85", "28", "27.0", "420", "410", "0,4%", "46.0%", "2.1"],
        ["AAIKO", "1.1", "1.05", "42", "43.0", "515", "520", "0,7%", "57.0%", "3.8"],
    ] {
        brands.push(row(&values));
    }

    RawDocument {
        pages: vec![RawPage {
            tables: vec![summary, RawTable { rows: brands }],
        }],
    }
}

fn write_source(dir: &Path, name: &str, document: &RawDocument) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(document).expect("serialize")).expect("write source");
    path
}

fn write_template(path: &Path, paragraphs: &[&str]) {
    let body = paragraphs
        .iter()
        .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
        .collect::<String>();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut writer = ZipWriter::new(File::create(path).expect("create template"));
    let options = SimpleFileOptions::default();
    writer
        .start_file("[Content_Types].xml", options)
        .expect("content types");
    writer.write_all(b"<Types/>").expect("write content types");
    writer
        .start_file("word/document.xml", options)
        .expect("document part");
    writer
        .write_all(document.as_bytes())
        .expect("write document part");
    writer.finish().expect("finish template");
}

fn request(cache_root: &Path, source: PathBuf, period: Option<u32>, year: i32) -> RunRequest {
    RunRequest {
        cache_root: cache_root.to_path_buf(),
        source,
        period,
        year: Some(year),
        template: None,
    }
}

#[test]
fn full_run_persists_every_artifact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_root = dir.path().join("cache");
    let source = write_source(dir.path(), "branche week 12.json", &branch_report());
    let template = dir.path().join("template.docx");
    write_template(
        &template,
        &[
            "Week {{period}} / {{year}} (previous {{previous_period}})",
            "{{primary_entity}}: {{revenue_index_freebird}} vs {{revenue_index_group_average}}",
            "{{margin_harper_yve}}",
            "{{analysis_summary}}",
            "{{not_a_placeholder}}",
        ],
    );

    let mut run = request(&cache_root, source, None, 2026);
    run.template = Some(template);
    let manifest = run_pipeline(&run, &Configuration::default()).expect("run");

    assert_eq!(manifest.run_id, "period_12_2026");
    assert_eq!(manifest.status, "completed");
    assert_eq!(manifest.summary.total_entities, 5);
    assert!(manifest.summary.summary_table_available);
    assert_eq!(manifest.summary.primary.revenue_index, Some(1.3));
    assert_eq!(manifest.summary.competitors.len(), 6);
    assert!(!manifest.template_fallback_used);
    assert!(
        manifest
            .warnings
            .iter()
            .any(|warning| warning.contains("not_a_placeholder"))
    );

    let output = cache_root.join("output").join("period_12_2026");
    for file in [
        &manifest.files.report,
        &manifest.files.detail_table,
        &manifest.files.summary_table,
        &manifest.files.source,
        &"manifest.json".to_string(),
    ] {
        assert!(output.join(file).is_file(), "{file} missing");
    }
    assert!(
        cache_root
            .join("input/period_12_2026/branche week 12.json")
            .is_file()
    );
    assert_eq!(manifest.files.report, "Report_Period_12_2026.docx");

    let detail = read_detail_csv(&output.join(&manifest.files.detail_table)).expect("detail");
    assert_eq!(detail.len(), 5);
    assert_eq!(detail[3].name, "HARPER & YVE");

    let report = TemplateDocument::open(&output.join(&manifest.files.report)).expect("report");
    let texts = report.paragraph_texts();
    assert_eq!(texts[0], "Week 12 / 2026 (previous 11)");
    assert!(texts[1].starts_with("FREEBIRD: 1.30 vs "));
    assert_eq!(texts[2], "46.00%");
    assert!(texts[3].contains("=== OVERALL PERFORMANCE ==="));
    assert_eq!(texts[4], "{{not_a_placeholder}}");

    let stored = load_manifest(&cache_root, "period_12_2026").expect("stored manifest");
    assert_eq!(stored.run_id, manifest.run_id);
    assert_eq!(stored.source_sha256, manifest.source_sha256);
    assert_eq!(stored.summary.primary, manifest.summary.primary);
}

#[test]
fn empty_document_still_reaches_persisted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_root = dir.path().join("cache");
    let source = write_source(dir.path(), "empty.json", &RawDocument::default());

    let manifest = run_pipeline(
        &request(&cache_root, source, Some(4), 2026),
        &Configuration::default(),
    )
    .expect("run");

    assert_eq!(manifest.summary.total_entities, 0);
    assert!(!manifest.summary.summary_table_available);
    assert!(manifest.template_fallback_used);
    assert_eq!(manifest.summary.group_average.margin, None);
    assert!(manifest.warnings.len() >= 3);

    let output = cache_root.join("output/period_4_2026");
    assert!(output.join("manifest.json").is_file());
    let report = TemplateDocument::open(&output.join("Report_Period_4_2026.docx")).expect("fallback");
    let texts = report.paragraph_texts();
    assert_eq!(texts[0], "Brand report period 4 - 2026");
    assert_eq!(texts[1], "Entities analyzed: 0");
    assert_eq!(texts[2], "FREEBIRD revenue index: N/A");
}

#[test]
fn missing_template_falls_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_root = dir.path().join("cache");
    let source = write_source(dir.path(), "week 9.json", &branch_report());

    let mut run = request(&cache_root, source, None, 2026);
    run.template = Some(dir.path().join("absent.docx"));
    let manifest = run_pipeline(&run, &Configuration::default()).expect("run");

    assert!(manifest.template_fallback_used);
    let report = TemplateDocument::open(
        &cache_root.join("output/period_9_2026").join(&manifest.files.report),
    )
    .expect("fallback");
    assert_eq!(report.paragraph_texts()[1], "Entities analyzed: 5");
    assert_eq!(report.paragraph_texts()[2], "FREEBIRD revenue index: 1.30");
}

#[test]
fn unreadable_source_fails_without_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_root = dir.path().join("cache");

    let missing = request(&cache_root, dir.path().join("week 3.json"), None, 2026);
    assert!(run_pipeline(&missing, &Configuration::default()).is_err());
    assert!(!cache_root.join("output/period_3_2026/manifest.json").exists());

    let garbled = dir.path().join("week 5.json");
    fs::write(&garbled, "not a table dump").expect("write");
    let garbled = request(&cache_root, garbled, None, 2026);
    assert!(run_pipeline(&garbled, &Configuration::default()).is_err());
    assert!(!cache_root.join("output/period_5_2026/manifest.json").exists());

    assert!(list_manifests(&cache_root).expect("list").is_empty());
}

#[test]
fn runs_are_listed_newest_first_and_deleted_idempotently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_root = dir.path().join("cache");
    let source = write_source(dir.path(), "report.json", &branch_report());

    for (period, year) in [(3, 2026), (10, 2025), (1, 2026), (3, 2026)] {
        run_pipeline(
            &request(&cache_root, source.clone(), Some(period), year),
            &Configuration::default(),
        )
        .expect("run");
    }

    let ids = list_manifests(&cache_root)
        .expect("list")
        .into_iter()
        .map(|manifest| manifest.run_id)
        .collect::<Vec<String>>();
    assert_eq!(ids, vec!["period_3_2026", "period_1_2026", "period_10_2025"]);

    assert!(delete_run(&cache_root, "period_1_2026").expect("delete"));
    assert!(!cache_root.join("output/period_1_2026").exists());
    assert!(!cache_root.join("input/period_1_2026").exists());
    assert!(!delete_run(&cache_root, "period_1_2026").expect("delete again"));
    assert_eq!(list_manifests(&cache_root).expect("list").len(), 2);

    let trend = metric_trend(
        &list_manifests(&cache_root).expect("list"),
        "FREEBIRD",
        |snapshot| snapshot.revenue_index,
    );
    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0].run_id, "period_10_2025");
    assert_eq!(trend[1].value, Some(1.3));
}

#[test]
fn rerun_from_stored_input_copy_keeps_the_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_root = dir.path().join("cache");
    let source = write_source(dir.path(), "report.json", &branch_report());
    let first = run_pipeline(
        &request(&cache_root, source, Some(6), 2026),
        &Configuration::default(),
    )
    .expect("first run");

    let stored = cache_root.join("input/period_6_2026/report.json");
    let before = fs::read(&stored).expect("stored input");
    let rerun = run_pipeline(
        &request(&cache_root, stored.clone(), Some(6), 2026),
        &Configuration::default(),
    )
    .expect("rerun");

    assert_eq!(fs::read(&stored).expect("stored input after rerun"), before);
    assert_eq!(rerun.source_sha256, first.source_sha256);
    assert_eq!(rerun.summary.total_entities, 5);
    assert!(cache_root.join("output/period_6_2026/manifest.json").is_file());
}

#[test]
fn failed_rerun_keeps_the_previous_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_root = dir.path().join("cache");
    let source = write_source(dir.path(), "report.json", &branch_report());
    run_pipeline(
        &request(&cache_root, source, Some(7), 2026),
        &Configuration::default(),
    )
    .expect("first run");

    let garbled = dir.path().join("garbled.json");
    fs::write(&garbled, "not a table dump").expect("write");
    assert!(
        run_pipeline(
            &request(&cache_root, garbled, Some(7), 2026),
            &Configuration::default(),
        )
        .is_err()
    );

    let manifest = load_manifest(&cache_root, "period_7_2026").expect("previous manifest");
    assert_eq!(manifest.summary.total_entities, 5);
}
