use anyhow::Result;
use tracing::info;

use crate::cli::DeleteArgs;
use crate::report::delete_run;

pub fn run(args: DeleteArgs) -> Result<()> {
    let removed = delete_run(&args.cache_root, &args.run_id)?;
    if !removed {
        info!(run_id = %args.run_id, "nothing to delete");
    }
    Ok(())
}
