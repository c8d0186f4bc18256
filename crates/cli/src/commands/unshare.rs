// `boardpad unshare`: decode a share link or token.

use boardpad_common::link::parse_share_input;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct UnshareArgs {
    /// A full share link or a bare token.
    pub input: String,

    /// Store the shared board under this name.
    #[arg(long, value_name = "NAME")]
    save: Option<String>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnshareResult {
    pub version: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_id: Option<String>,
}

pub fn run(args: UnshareArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match unshare(&args.input, args.save.as_deref(), ctx) {
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

fn unshare(input: &str, save: Option<&str>, ctx: &CliContext) -> anyhow::Result<UnshareResult> {
    let payload = parse_share_input(input)?;
    if !ctx.config().catalog().contains(&payload.version) {
        output::print_warning(
            OutputFormat::detect(false),
            "UNSUPPORTED_VERSION",
            &format!("shared board targets unsupported version {}", payload.version),
        );
    }

    let saved_id = match save {
        Some(name) => {
            Some(ctx.open_store()?.create(name, &payload.content, Some(&payload.version))?)
        }
        None => None,
    };
    Ok(UnshareResult { version: payload.version, content: payload.content, saved_id })
}

fn format_human(result: &UnshareResult) -> String {
    match &result.saved_id {
        Some(id) => format!("Saved shared board as {id} ({})", result.version),
        None => result.content.clone(),
    }
}
