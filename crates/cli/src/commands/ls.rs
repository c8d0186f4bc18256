// `boardpad ls`: list stored documents.

use boardpad_common::types::FileSummary;
use clap::Args;
use serde::{Deserialize, Serialize};

use super::format_timestamp;
use crate::context::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsResult {
    #[serde(default)]
    pub documents: Vec<FileSummary>,
}

pub fn run(args: LsArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match list(ctx) {
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

fn list(ctx: &CliContext) -> anyhow::Result<LsResult> {
    let documents = ctx.open_store()?.list()?;
    Ok(LsResult { documents })
}

fn format_human(result: &LsResult) -> String {
    if result.documents.is_empty() {
        return "No documents stored.".into();
    }

    let mut lines = Vec::new();
    lines.push(format!("{} document(s)", result.documents.len()));
    for doc in &result.documents {
        let version = doc.board_version.as_deref().unwrap_or("-");
        lines.push(format!(
            "  {}  {}  [{version}]  updated {}",
            doc.id,
            doc.name,
            format_timestamp(doc.metadata.updated_at)
        ));
    }
    lines.join("\n")
}
