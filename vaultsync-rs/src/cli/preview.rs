//! Preview command implementation.

use crate::cli::args::PreviewArgs;
use crate::cli::output::Output;
use crate::cli::Context;
use crate::convert::{count_blocks, RemoteBlock};
use crate::error::Result;
use crate::remote::PageMeta;
use crate::sync::prepare_page;
use crate::types::{note_key, Frontmatter};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub path: String,
    pub frontmatter: Frontmatter,
    pub properties: PageMeta,
    pub block_count: usize,
    pub blocks: Vec<Value>,
}

pub fn run(ctx: &Context, args: &PreviewArgs, output: &Output) -> Result<()> {
    let path = normalize_note_path(&ctx.vault.root, &args.note);
    let note = ctx.vault.load_note(&path)?;
    let page = prepare_page(&note)?;

    output.print(&PreviewResponse {
        path: note_key(&path),
        frontmatter: page.frontmatter,
        properties: page.meta,
        block_count: count_blocks(&page.blocks),
        blocks: page.blocks.iter().map(RemoteBlock::to_json).collect(),
    })
}

/// Vault-relative path for a note argument, adding `.md` if missing.
pub fn normalize_note_path(vault_root: &Path, note: &str) -> PathBuf {
    let note = note.trim();
    let path = if note.ends_with(".md") {
        PathBuf::from(note)
    } else {
        PathBuf::from(format!("{}.md", note))
    };

    match path.strip_prefix(vault_root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => path,
    }
}
