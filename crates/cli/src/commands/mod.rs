// CLI subcommand dispatch.

use clap::Subcommand;

use crate::context::CliContext;

pub mod clear;
pub mod edit;
pub mod export;
pub mod ls;
pub mod new;
pub mod open_next;
pub mod rename;
pub mod rm;
pub mod share;
pub mod show;
pub mod unshare;

#[derive(Subcommand)]
pub enum Command {
    /// Create a stored document
    New(new::NewArgs),
    /// List stored documents, newest first
    Ls(ls::LsArgs),
    /// Print a document and its metadata
    Show(show::ShowArgs),
    /// Rename a document
    Rename(rename::RenameArgs),
    /// Delete a document
    Rm(rm::RmArgs),
    /// Delete every document in the namespace
    Clear(clear::ClearArgs),
    /// Write a document to a local file
    Export(export::ExportArgs),
    /// Print a share link for a document
    Share(share::ShareArgs),
    /// Decode a share link, optionally saving it as a document
    Unshare(unshare::UnshareArgs),
    /// Mark a document to open in the next editing session
    OpenNext(open_next::OpenNextArgs),
    /// Edit a document through a local file with autosave
    Edit(edit::EditArgs),
}

pub fn run(cmd: Command, ctx: &CliContext) -> anyhow::Result<()> {
    match cmd {
        Command::New(args) => new::run(args, ctx),
        Command::Ls(args) => ls::run(args, ctx),
        Command::Show(args) => show::run(args, ctx),
        Command::Rename(args) => rename::run(args, ctx),
        Command::Rm(args) => rm::run(args, ctx),
        Command::Clear(args) => clear::run(args, ctx),
        Command::Export(args) => export::run(args, ctx),
        Command::Share(args) => share::run(args, ctx),
        Command::Unshare(args) => unshare::run(args, ctx),
        Command::OpenNext(args) => open_next::run(args, ctx),
        Command::Edit(args) => edit::run(args, ctx),
    }
}

/// UTC timestamp for human output.
pub(crate) fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}
