use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ShowArgs;
use crate::report::export::read_detail_csv;
use crate::report::load_manifest;
use crate::report::store::RunLayout;

pub fn run(args: ShowArgs) -> Result<()> {
    let manifest = load_manifest(&args.cache_root, &args.run_id)?;
    let mut output = io::BufWriter::new(io::stdout().lock());

    if args.detail {
        let layout = RunLayout::new(&args.cache_root, &manifest.run_id)?;
        let records = read_detail_csv(&layout.output_dir.join(&manifest.files.detail_table))?;
        info!(run_id = %manifest.run_id, rows = records.len(), "loaded detail table");

        for record in &records {
            let cells = record
                .to_cells()
                .into_iter()
                .map(|cell| cell.unwrap_or("-"))
                .collect::<Vec<&str>>();
            writeln!(output, "{}", cells.join("\t"))?;
        }
    } else {
        serde_json::to_writer_pretty(&mut output, &manifest)
            .with_context(|| format!("failed to serialize manifest {}", args.run_id))?;
        writeln!(output)?;
    }
    output.flush()?;

    Ok(())
}
