use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::model::{MetricSnapshot, RunFiles, RunManifest, RunSummary};
use crate::util::{ensure_directory, now_utc_string, sha256_file, write_json_pretty};

use super::analyze::{TABLE_LENSES, fmt_value, run_lens};
use super::export::{write_detail_csv, write_summary_csv};
use super::extract::TableExtractor;
use super::snapshot::{competitor_snapshots, group_average, placeholder_key, snapshot_for};
use super::source::loader_for;
use super::store::{RunLayout, run_id_for};
use super::synthesize::{season_comparison, synthesize_summary};
use super::tables::{EntityRecord, SummaryRow, normalize_entities};
use super::template::{Substitutions, TemplateDocument};

const MANIFEST_VERSION: u32 = 1;
pub const DETAIL_TABLE_FILE: &str = "detail_table.csv";
pub const SUMMARY_TABLE_FILE: &str = "summary_table.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Uploaded,
    TablesExtracted,
    Analyzed,
    DocumentFilled,
    Persisted,
}

impl RunStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::TablesExtracted => "tables_extracted",
            Self::Analyzed => "analyzed",
            Self::DocumentFilled => "document_filled",
            Self::Persisted => "persisted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub cache_root: PathBuf,
    pub source: PathBuf,
    pub period: Option<u32>,
    pub year: Option<i32>,
    pub template: Option<PathBuf>,
}

struct Analysis {
    entity_count: usize,
    findings: Vec<(&'static str, String)>,
    primary: Option<MetricSnapshot>,
    group_average: MetricSnapshot,
    competitors: BTreeMap<String, MetricSnapshot>,
}

impl Analysis {
    fn compute(
        records: &[EntityRecord],
        summary: Option<&SummaryRow>,
        config: &Configuration,
    ) -> Self {
        let table = normalize_entities(records);

        let mut findings = Vec::with_capacity(TABLE_LENSES.len() + 2);
        for lens in TABLE_LENSES {
            let text = run_lens(lens, &table, &config.thresholds);
            debug!(lens = lens.key(), chars = text.len(), "lens finished");
            findings.push((lens.placeholder(), text));
        }

        let primary = snapshot_for(&table, &config.primary_brand);
        let average = group_average(&table);
        let competitors = competitor_snapshots(&table, &config.tracked_brands());

        findings.push((
            "analysis_season_comparison",
            season_comparison(summary, &config.primary_brand, primary.as_ref()),
        ));
        findings.push((
            "analysis_summary",
            synthesize_summary(
                &config.primary_brand,
                primary.as_ref(),
                &average,
                &competitors,
                &config.peer_group,
            ),
        ));

        Self {
            entity_count: table.len(),
            findings,
            primary,
            group_average: average,
            competitors,
        }
    }

    fn substitutions(&self, period: u32, year: i32, primary_brand: &str) -> Substitutions {
        let mut substitutions = Substitutions::default();
        substitutions.insert("period", period.to_string());
        substitutions.insert("year", year.to_string());
        substitutions.insert("previous_period", previous_period(period, year).to_string());
        substitutions.insert("primary_entity", primary_brand);
        substitutions.insert("entity_count", self.entity_count.to_string());

        for (brand, snapshot) in &self.competitors {
            insert_snapshot(&mut substitutions, &placeholder_key(brand), snapshot);
        }
        insert_snapshot(&mut substitutions, "group_average", &self.group_average);

        for (placeholder, text) in &self.findings {
            substitutions.insert(*placeholder, text.as_str());
        }
        substitutions
    }
}

fn insert_snapshot(substitutions: &mut Substitutions, key: &str, snapshot: &MetricSnapshot) {
    for (metric, value) in snapshot.display_values() {
        substitutions.insert(format!("{metric}_{key}"), value);
    }
}

fn previous_period(period: u32, year: i32) -> u32 {
    if period > 1 {
        return period - 1;
    }
    if NaiveDate::from_isoywd_opt(year - 1, 53, Weekday::Mon).is_some() {
        53
    } else {
        52
    }
}

fn log_stage(run_id: &str, stage: RunStage) {
    info!(run_id, stage = stage.as_str(), "run stage reached");
}

/// Only an unreadable source or an unwritable cache location fails the run.
pub fn run_pipeline(request: &RunRequest, config: &Configuration) -> Result<RunManifest> {
    let source_filename = request
        .source
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("source path has no file name: {}", request.source.display()))?;

    let (period, year) = resolve_period(request, &source_filename)?;
    let run_id = run_id_for(period, year);
    let layout = RunLayout::new(&request.cache_root, &run_id)?;

    let source_sha256 = sha256_file(&request.source)
        .with_context(|| format!("cannot read source document {}", request.source.display()))?;

    ensure_directory(&layout.input_dir)?;
    ensure_directory(&layout.output_dir)?;

    let uploaded = layout.input_dir.join(&source_filename);
    copy_file(&request.source, &uploaded)?;
    log_stage(&run_id, RunStage::Uploaded);

    let document = loader_for(&uploaded)?
        .load(&uploaded)
        .with_context(|| format!("cannot read source document {}", request.source.display()))?;

    let manifest_path = layout.manifest_path();
    if manifest_path.exists() {
        fs::remove_file(&manifest_path)
            .with_context(|| format!("failed to remove stale manifest {}", manifest_path.display()))?;
    }

    let extracted = TableExtractor::new(config.extraction.clone())?.extract(&document);
    let mut warnings = extracted.warnings.clone();

    write_detail_csv(&layout.output_dir.join(DETAIL_TABLE_FILE), &extracted.entities)?;
    write_summary_csv(
        &layout.output_dir.join(SUMMARY_TABLE_FILE),
        extracted.summary.as_ref(),
    )?;
    copy_file(&uploaded, &layout.output_dir.join(&source_filename))?;
    info!(
        run_id = %run_id,
        entities = extracted.entities.len(),
        summary = extracted.summary.is_some(),
        short_rows = extracted.short_rows,
        overlong_rows = extracted.overlong_rows,
        "tables exported"
    );
    log_stage(&run_id, RunStage::TablesExtracted);

    let analysis = Analysis::compute(&extracted.entities, extracted.summary.as_ref(), config);
    log_stage(&run_id, RunStage::Analyzed);

    let report_name = format!("Report_Period_{period}_{year}.docx");
    let primary_revenue = analysis.primary.and_then(|snapshot| snapshot.revenue_index);
    let fallback = FallbackContent {
        title: format!("Brand report period {period} - {year}"),
        lines: vec![
            format!("Entities analyzed: {}", analysis.entity_count),
            format!(
                "{} revenue index: {}",
                config.primary_brand,
                fmt_value(primary_revenue, 2)
            ),
        ],
    };
    let template_fallback_used = fill_report(
        request.template.as_deref(),
        &analysis.substitutions(period, year, &config.primary_brand),
        &fallback,
        &layout.output_dir.join(&report_name),
        &mut warnings,
    )?;
    log_stage(&run_id, RunStage::DocumentFilled);

    let manifest = RunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: run_id.clone(),
        period,
        year,
        created_at: now_utc_string(),
        status: "completed".to_string(),
        source_filename: source_filename.clone(),
        source_sha256,
        files: RunFiles {
            report: report_name,
            detail_table: DETAIL_TABLE_FILE.to_string(),
            summary_table: SUMMARY_TABLE_FILE.to_string(),
            source: source_filename,
        },
        summary: RunSummary {
            total_entities: analysis.entity_count,
            summary_table_available: extracted.summary.is_some(),
            primary_entity: config.primary_brand.clone(),
            primary: analysis.primary.unwrap_or_default(),
            competitors: analysis.competitors.clone(),
            group_average: analysis.group_average,
        },
        template_fallback_used,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;
    log_stage(&run_id, RunStage::Persisted);

    Ok(manifest)
}

struct FallbackContent {
    title: String,
    lines: Vec<String>,
}

fn fill_report(
    template: Option<&Path>,
    substitutions: &Substitutions,
    fallback: &FallbackContent,
    output: &Path,
    warnings: &mut Vec<String>,
) -> Result<bool> {
    let opened = match template {
        Some(path) => TemplateDocument::open(path).map_err(|error| {
            format!("template unavailable, using fallback document: {error:#}")
        }),
        None => Err("no template given, using fallback document".to_string()),
    };

    let (document, fallback_used) = match opened {
        Ok(mut document) => {
            let changed = document.apply(substitutions);
            debug!(paragraphs = changed, placeholders = substitutions.len(), "template filled");

            let unresolved = document.unresolved_placeholders();
            if !unresolved.is_empty() {
                let message = format!("unresolved template placeholders: {}", unresolved.join(", "));
                warn!("{message}");
                warnings.push(message);
            }
            (document, false)
        }
        Err(message) => {
            warn!("{message}");
            warnings.push(message);

            (TemplateDocument::fallback(&fallback.title, &fallback.lines)?, true)
        }
    };

    document.save(output)?;
    Ok(fallback_used)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if is_same_file(from, to) {
        debug!(path = %to.display(), "source already in place");
        return Ok(());
    }
    fs::copy(from, to)
        .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

fn is_same_file(left: &Path, right: &Path) -> bool {
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

fn resolve_period(request: &RunRequest, source_filename: &str) -> Result<(u32, i32)> {
    let today = Utc::now().date_naive();
    let period = match request.period {
        Some(period) => period,
        None => match period_from_filename(source_filename)? {
            Some(period) => period,
            None => today.iso_week().week(),
        },
    };
    Ok((period, request.year.unwrap_or_else(|| today.year())))
}

pub fn period_from_filename(name: &str) -> Result<Option<u32>> {
    let pattern = Regex::new(r"(?i)(?:week|wk)[\s_-]*(\d+)")
        .context("failed to compile period regex")?;
    Ok(pattern
        .captures(name)
        .and_then(|captures| captures[1].parse::<u32>().ok())
        .filter(|period| (1..=53).contains(period)))
}
