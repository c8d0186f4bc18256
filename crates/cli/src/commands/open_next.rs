// `boardpad open-next`: hand a document to the next editing session.

use boardpad_session::store::StoreError;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct OpenNextArgs {
    /// Document id.
    pub id: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenNextResult {
    pub id: String,
    pub name: String,
}

pub fn run(args: OpenNextArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match mark(&args.id, ctx) {
        Ok(result) => {
            output::print_output(format, &result, |r| {
                format!("{} will open in the next session", r.name)
            })?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn mark(id: &str, ctx: &CliContext) -> anyhow::Result<OpenNextResult> {
    let mut store = ctx.open_store()?;
    let record = store.load(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    store.request_open(id)?;
    Ok(OpenNextResult { id: record.id, name: record.name })
}
