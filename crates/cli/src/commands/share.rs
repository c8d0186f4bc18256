// `boardpad share`: print a share link for a stored document.

use anyhow::Context;
use boardpad_common::link::share_link;
use boardpad_common::share;
use boardpad_common::types::SharePayload;
use boardpad_session::store::StoreError;
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

/// Page the link opens when `--base` is not given.
pub const DEFAULT_SHARE_BASE: &str = "https://boardpad.dev/";

#[derive(Debug, Args)]
pub struct ShareArgs {
    /// Document id.
    pub id: String,

    /// Base URL of the page that opens shared boards.
    #[arg(long, value_name = "URL", default_value = DEFAULT_SHARE_BASE)]
    base: String,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResult {
    pub id: String,
    pub version: String,
    pub token: String,
    pub link: String,
}

pub fn run(args: ShareArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match build_link(&args.id, &args.base, ctx) {
        Ok(result) => {
            output::print_output(format, &result, |r| r.link.clone())?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn build_link(id: &str, base: &str, ctx: &CliContext) -> anyhow::Result<ShareResult> {
    let base = Url::parse(base).with_context(|| format!("invalid base URL `{base}`"))?;
    let record = ctx.open_store()?.load(id)?.ok_or_else(|| StoreError::NotFound(id.into()))?;

    // Unversioned documents are shared against the newest library.
    let catalog = ctx.config().catalog();
    let version = record
        .board_version
        .or_else(|| catalog.newest().map(str::to_string))
        .unwrap_or_default();
    let payload = SharePayload { content: record.content, version };

    let token = share::encode(&payload)?;
    let link = share_link(&base, &payload)?;
    Ok(ShareResult {
        id: id.to_string(),
        version: payload.version,
        token,
        link: link.to_string(),
    })
}
