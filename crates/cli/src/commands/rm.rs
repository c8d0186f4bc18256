// `boardpad rm`: delete documents.

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RmArgs {
    /// Document ids to delete. Unknown ids are ignored.
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmResult {
    pub removed: Vec<String>,
    pub missing: Vec<String>,
}

pub fn run(args: RmArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match remove(&args.ids, ctx) {
        Ok(result) => {
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn remove(ids: &[String], ctx: &CliContext) -> anyhow::Result<RmResult> {
    let mut store = ctx.open_store()?;
    let mut result = RmResult { removed: Vec::new(), missing: Vec::new() };
    for id in ids {
        // Corrupted records still count as present.
        let present = store.load(id).map(|record| record.is_some()).unwrap_or(true);
        store.delete(id)?;
        if present {
            result.removed.push(id.clone());
        } else {
            result.missing.push(id.clone());
        }
    }
    Ok(result)
}

fn format_human(result: &RmResult) -> String {
    let mut lines = vec![format!("Deleted {} document(s)", result.removed.len())];
    for id in &result.missing {
        lines.push(format!("  no document {id}"));
    }
    lines.join("\n")
}
