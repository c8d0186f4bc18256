// `boardpad show`: print a stored document.

use boardpad_common::types::FileRecord;
use boardpad_session::store::StoreError;
use clap::Args;

use super::format_timestamp;
use crate::context::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document id (see `boardpad ls`).
    pub id: String,

    /// Print only the content, without the header.
    #[arg(long)]
    raw: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ShowArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match load(&args.id, ctx) {
        Ok(record) if args.raw && format == OutputFormat::Human => {
            print!("{}", record.content);
            Ok(())
        }
        Ok(record) => {
            output::print_output(format, &record, format_human)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn load(id: &str, ctx: &CliContext) -> anyhow::Result<FileRecord> {
    let record = ctx.open_store()?.load(id)?;
    Ok(record.ok_or_else(|| StoreError::NotFound(id.to_string()))?)
}

fn format_human(record: &FileRecord) -> String {
    let mut lines = vec![
        format!("{} ({})", record.name, record.id),
        format!("version: {}", record.board_version.as_deref().unwrap_or("-")),
        format!("created: {}", format_timestamp(record.metadata.created_at)),
        format!("updated: {}", format_timestamp(record.metadata.updated_at)),
    ];
    for (key, value) in &record.metadata.extra {
        lines.push(format!("{key}: {value}"));
    }
    lines.push(String::new());
    lines.push(record.content.clone());
    lines.join("\n")
}
