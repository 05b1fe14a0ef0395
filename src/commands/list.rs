use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ListArgs;
use crate::report::list_manifests;

pub fn run(args: ListArgs) -> Result<()> {
    let manifests = list_manifests(&args.cache_root)?;
    info!(cache_root = %args.cache_root.display(), runs = manifests.len(), "listed runs");

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &manifests)
            .context("failed to serialize run list")?;
        writeln!(output)?;
    } else {
        for manifest in &manifests {
            writeln!(
                output,
                "{}\t{}\t{}\tentities={}\tfallback={}",
                manifest.run_id,
                manifest.created_at,
                manifest.source_filename,
                manifest.summary.total_entities,
                manifest.template_fallback_used,
            )?;
        }
    }
    output.flush()?;

    Ok(())
}
