// `boardpad clear`: delete every document in the configured namespace.

use anyhow::bail;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Required: confirm the deletion.
    #[arg(long)]
    yes: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResult {
    pub namespace: String,
    pub removed: usize,
}

pub fn run(args: ClearArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match clear(args.yes, ctx) {
        Ok(result) => {
            output::print_output(format, &result, |r| {
                format!("Deleted {} document(s) from {}", r.removed, r.namespace)
            })?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn clear(confirmed: bool, ctx: &CliContext) -> anyhow::Result<ClearResult> {
    if !confirmed {
        bail!("refusing to delete every document without --yes");
    }
    let mut store = ctx.open_store()?;
    let removed = store.clear_all()?;
    Ok(ClearResult { namespace: store.prefix().to_string(), removed })
}
