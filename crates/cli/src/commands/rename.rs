// `boardpad rename`: change a document's display name.

use boardpad_common::types::FilePatch;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Document id.
    pub id: String,

    /// New display name.
    pub name: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameResult {
    pub id: String,
    pub name: String,
}

pub fn run(args: RenameArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match rename(&args.id, &args.name, ctx) {
        Ok(result) => {
            output::print_output(format, &result, |r| format!("Renamed {} to {}", r.id, r.name))?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn rename(id: &str, name: &str, ctx: &CliContext) -> anyhow::Result<RenameResult> {
    ctx.open_store()?.update(id, FilePatch::name(name))?;
    Ok(RenameResult { id: id.to_string(), name: name.to_string() })
}
