use anyhow::Result;
use tracing::info;

use crate::cli::RunArgs;
use crate::config::load_configuration;
use crate::report::{RunRequest, run_pipeline};

pub fn run(args: RunArgs) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| args.cache_root.join("settings.json"));
    let config = load_configuration(&config_path);

    info!(
        source = %args.source.display(),
        cache_root = %args.cache_root.display(),
        primary = %config.primary_brand,
        "report run requested"
    );

    let request = RunRequest {
        cache_root: args.cache_root,
        source: args.source,
        period: args.period,
        year: args.year,
        template: args.template,
    };
    let manifest = run_pipeline(&request, &config)?;

    info!(
        run_id = %manifest.run_id,
        entities = manifest.summary.total_entities,
        report = %manifest.files.report,
        fallback = manifest.template_fallback_used,
        warnings = manifest.warnings.len(),
        "report run completed"
    );
    println!("{}", manifest.run_id);

    Ok(())
}
