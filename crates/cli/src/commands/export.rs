// `boardpad export`: write a document to a local file.

use std::path::PathBuf;

use boardpad_session::host::DirectorySink;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Document id.
    pub id: String,

    /// Directory to write into (defaults to the current directory).
    #[arg(long, value_name = "DIR", default_value = ".")]
    dir: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResult {
    pub id: String,
    pub filename: String,
    pub path: PathBuf,
}

pub fn run(args: ExportArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match export(&args.id, args.dir, ctx) {
        Ok(result) => {
            output::print_output(format, &result, |r| format!("Wrote {}", r.path.display()))?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn export(id: &str, dir: PathBuf, ctx: &CliContext) -> anyhow::Result<ExportResult> {
    let store = ctx.open_store()?;
    let mut sink = DirectorySink::new(dir);
    let filename = store.export(id, &mut sink)?;
    let path = sink.last_written().map(PathBuf::from).unwrap_or_else(|| sink.dir().join(&filename));
    Ok(ExportResult { id: id.to_string(), filename, path })
}
