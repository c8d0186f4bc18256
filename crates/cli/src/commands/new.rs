// `boardpad new`: create a stored document.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Display name for the document.
    pub name: String,

    /// Initial content.
    #[arg(long, group = "content_source")]
    content: Option<String>,

    /// Read initial content from a file (`-` for stdin).
    #[arg(long, value_name = "FILE", group = "content_source")]
    file: Option<PathBuf>,

    /// Board library version the document targets.
    #[arg(long = "board-version", value_name = "VERSION")]
    board_version: Option<String>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResult {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_version: Option<String>,
    pub bytes: usize,
}

pub fn run(args: NewArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match create(&args, ctx) {
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

fn create(args: &NewArgs, ctx: &CliContext) -> anyhow::Result<NewResult> {
    let content = match (&args.content, &args.file) {
        (Some(content), _) => content.clone(),
        (_, Some(path)) => read_content(path)?,
        (None, None) => ctx.config().default_content.clone(),
    };
    let version = args
        .board_version
        .clone()
        .or_else(|| ctx.config().catalog().newest().map(str::to_string));

    let mut store = ctx.open_store()?;
    let id = store
        .create(&args.name, &content, version.as_deref())
        .with_context(|| format!("failed to create `{}`", args.name))?;
    Ok(NewResult { id, name: args.name.clone(), board_version: version, bytes: content.len() })
}

pub(crate) fn read_content(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content).context("failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content file `{}`", path.display()))
}

fn format_human(result: &NewResult) -> String {
    let version = result.board_version.as_deref().unwrap_or("unversioned");
    format!("Created {} ({}, {version}, {} bytes)", result.name, result.id, result.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::temp_context;

    fn args(name: &str) -> NewArgs {
        NewArgs { name: name.into(), content: None, file: None, board_version: None, json: true }
    }

    #[test]
    fn creates_with_newest_version_by_default() {
        let (_dir, ctx) = temp_context();
        let args = NewArgs { content: Some("hi".into()), ..args("orbit") };
        let result = create(&args, &ctx).unwrap();

        assert_eq!(result.board_version.as_deref(), Some("0.3.1"));
        assert_eq!(result.bytes, 2);
        let record = ctx.open_store().unwrap().load(&result.id).unwrap().unwrap();
        assert_eq!(record.name, "orbit");
        assert_eq!(record.content, "hi");
    }

    #[test]
    fn content_can_come_from_file() {
        let (dir, ctx) = temp_context();
        let path = dir.path().join("seed.js");
        std::fs::write(&path, "from file").unwrap();
        let result = create(&NewArgs { file: Some(path), ..args("seeded") }, &ctx).unwrap();

        let record = ctx.open_store().unwrap().load(&result.id).unwrap().unwrap();
        assert_eq!(record.content, "from file");
    }

    #[test]
    fn missing_content_file_is_an_error() {
        let (dir, ctx) = temp_context();
        let args = NewArgs { file: Some(dir.path().join("nope.js")), ..args("x") };
        let err = create(&args, &ctx).unwrap_err();
        assert!(format!("{err:#}").contains("nope.js"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let (_dir, ctx) = temp_context();
        assert!(create(&args("  "), &ctx).is_err());
        assert!(ctx.open_store().unwrap().list().unwrap().is_empty());
    }

    #[test]
    fn human_format_mentions_id_and_version() {
        let result = NewResult {
            id: "1-abc".into(),
            name: "orbit".into(),
            board_version: None,
            bytes: 3,
        };
        let text = format_human(&result);
        assert!(text.contains("1-abc"));
        assert!(text.contains("unversioned"));
    }

    #[test]
    fn json_format_roundtrips() {
        let result = NewResult {
            id: "1-abc".into(),
            name: "orbit".into(),
            board_version: Some("0.3.0".into()),
            bytes: 3,
        };
        let mut buf = Vec::new();
        output::write_output(&mut buf, OutputFormat::Json, &result, format_human).unwrap();
        let parsed: NewResult = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed.id, "1-abc");
        assert_eq!(parsed.board_version.as_deref(), Some("0.3.0"));
    }
}
