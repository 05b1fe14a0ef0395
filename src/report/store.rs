use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::model::RunManifest;
use crate::util::read_json;

pub const MANIFEST_FILE: &str = "manifest.json";

pub fn run_id_for(period: u32, year: i32) -> String {
    format!("period_{period}_{year}")
}

/// Parses a `period_<N>_<year>` identifier. Anything else is rejected, which
/// keeps ids from escaping the cache root.
pub fn parse_run_id(run_id: &str) -> Result<(u32, i32)> {
    let parsed = run_id
        .strip_prefix("period_")
        .and_then(|rest| rest.split_once('_'))
        .and_then(|(period, year)| Some((period.parse::<u32>().ok()?, year.parse::<i32>().ok()?)));

    match parsed {
        Some((period, year))
            if (1..=53).contains(&period) && year > 0 && run_id_for(period, year) == run_id =>
        {
            Ok((period, year))
        }
        _ => bail!("invalid run id '{run_id}': expected period_<N>_<year>"),
    }
}

#[derive(Debug, Clone)]
pub struct RunLayout {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl RunLayout {
    pub fn new(cache_root: &Path, run_id: &str) -> Result<Self> {
        parse_run_id(run_id)?;
        Ok(Self {
            input_dir: cache_root.join("input").join(run_id),
            output_dir: cache_root.join("output").join(run_id),
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(MANIFEST_FILE)
    }
}

pub fn list_manifests(cache_root: &Path) -> Result<Vec<RunManifest>> {
    let output_root = cache_root.join("output");
    if !output_root.exists() {
        return Ok(Vec::new());
    }

    let mut manifests = Vec::new();
    for entry in fs::read_dir(&output_root)
        .with_context(|| format!("failed to list {}", output_root.display()))?
    {
        let entry = entry.with_context(|| format!("failed to list {}", output_root.display()))?;
        let path = entry.path().join(MANIFEST_FILE);
        if !path.is_file() {
            debug!(path = %entry.path().display(), "run directory without manifest");
            continue;
        }

        match read_json::<RunManifest>(&path) {
            Ok(manifest) => manifests.push(manifest),
            Err(error) => {
                warn!(path = %path.display(), error = %format!("{error:#}"), "skipping unreadable manifest");
            }
        }
    }

    manifests.sort_by(|left, right| {
        (right.year, right.period).cmp(&(left.year, left.period))
    });
    Ok(manifests)
}

pub fn load_manifest(cache_root: &Path, run_id: &str) -> Result<RunManifest> {
    let layout = RunLayout::new(cache_root, run_id)?;
    let path = layout.manifest_path();
    if !path.is_file() {
        bail!("run not found: {run_id}");
    }
    read_json(&path)
}

pub fn delete_run(cache_root: &Path, run_id: &str) -> Result<bool> {
    let layout = RunLayout::new(cache_root, run_id)?;

    let mut removed = false;
    for dir in [&layout.output_dir, &layout.input_dir] {
        if dir.exists() {
            fs::remove_dir_all(dir)
                .with_context(|| format!("failed to remove {}", dir.display()))?;
            removed = true;
        }
    }

    info!(run_id, removed, "deleted run");
    Ok(removed)
}
