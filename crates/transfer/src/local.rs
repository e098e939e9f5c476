// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-filesystem backend.
//!
//! A "remote" is a directory under the connection's configured root. Sync
//! walks trees, skips files whose size and mtime already match, and copies
//! the rest in chunks with per-chunk cancellation checks.

use crate::error::TransferError;
use crate::fs::{RemoteFs, SyncContext};
use crate::log::{TransferAction, TransferEvent};
use crate::remotes::ProviderFactory;
use async_trait::async_trait;
use sk_core::{ConflictResolution, Connection};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const COPY_CHUNK: usize = 64 * 1024;

/// Factory for `provider = "local"` connections.
///
/// Config keys: `root` — base directory remote paths resolve under.
pub struct LocalProvider;

impl ProviderFactory for LocalProvider {
    fn provider(&self) -> &str {
        "local"
    }

    fn open(&self, conn: &Connection, remote_path: &str) -> Result<Arc<dyn RemoteFs>, TransferError> {
        let root = conn
            .config_value("root")
            .ok_or_else(|| TransferError::Config(format!("connection {}: missing 'root'", conn.name)))?;
        let base = Path::new(root).join(remote_path.trim_start_matches('/'));
        Ok(Arc::new(LocalFs { base }))
    }
}

/// A bound local remote: one directory.
pub struct LocalFs {
    base: PathBuf,
}

impl LocalFs {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileMeta {
    size: u64,
    mtime_secs: u64,
}

fn mtime_secs(meta: &std::fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn scan_into(
    root: &Path,
    dir: &Path,
    out: &mut BTreeMap<String, FileMeta>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        let path = entry.path();
        if meta.is_dir() {
            scan_into(root, &path, out)?;
        } else if meta.is_file() {
            let rel = path
                .strip_prefix(root)
                .map_err(|_| std::io::Error::other("path escaped scan root"))?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.insert(rel, FileMeta { size: meta.len(), mtime_secs: mtime_secs(&meta) });
        }
    }
    Ok(())
}

/// Walk a tree, returning relative-path → metadata. A single-file root maps
/// to its file name; a missing root is `MissingSource`.
async fn scan_tree(root: &Path) -> Result<BTreeMap<String, FileMeta>, TransferError> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let meta = std::fs::metadata(&root)
            .map_err(|_| TransferError::MissingSource(root.clone()))?;
        let mut out = BTreeMap::new();
        if meta.is_file() {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "file".to_string());
            out.insert(name, FileMeta { size: meta.len(), mtime_secs: mtime_secs(&meta) });
            return Ok(out);
        }
        scan_into(&root, &root, &mut out)?;
        Ok(out)
    })
    .await
    .map_err(|e| TransferError::Config(format!("scan task failed: {e}")))?
}

/// Tree scan that treats a missing root as empty (destination side).
async fn scan_tree_or_empty(root: &Path) -> Result<BTreeMap<String, FileMeta>, TransferError> {
    match scan_tree(root).await {
        Ok(map) => Ok(map),
        Err(TransferError::MissingSource(_)) => Ok(BTreeMap::new()),
        Err(e) => Err(e),
    }
}

fn rel_to_path(root: &Path, rel: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in rel.split('/') {
        path.push(part);
    }
    path
}

async fn copy_file(
    ctx: &SyncContext,
    from: &Path,
    to: &Path,
    rel: &str,
    meta: FileMeta,
) -> Result<(), TransferError> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TransferError::file(rel, e))?;
    }

    ctx.stats.start_file(rel, meta.size);
    let result = copy_contents(ctx, from, to, rel).await;
    match result {
        Ok(copied) => {
            ctx.stats.finish_file(rel);
            ctx.emit(TransferEvent::new(
                rel,
                TransferAction::Transfer,
                format!("copied {copied} bytes"),
            ));
            restore_mtime(to, meta.mtime_secs);
            Ok(())
        }
        Err(TransferError::Cancelled) => {
            ctx.stats.abort_file(rel);
            Err(TransferError::Cancelled)
        }
        Err(e) => {
            ctx.stats.abort_file(rel);
            ctx.stats.add_error();
            ctx.emit(TransferEvent::new(rel, TransferAction::Error, e.to_string()));
            Err(e)
        }
    }
}

async fn copy_contents(
    ctx: &SyncContext,
    from: &Path,
    to: &Path,
    rel: &str,
) -> Result<u64, TransferError> {
    let mut src = tokio::fs::File::open(from).await.map_err(|e| TransferError::file(rel, e))?;
    let mut dst = tokio::fs::File::create(to).await.map_err(|e| TransferError::file(rel, e))?;
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut copied = 0u64;
    loop {
        ctx.check_cancelled()?;
        let n = src.read(&mut buf).await.map_err(|e| TransferError::file(rel, e))?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n]).await.map_err(|e| TransferError::file(rel, e))?;
        ctx.stats.progress_file(rel, n as u64);
        copied += n as u64;
    }
    dst.flush().await.map_err(|e| TransferError::file(rel, e))?;
    Ok(copied)
}

/// Carry the source mtime so unchanged files are skipped next run.
fn restore_mtime(path: &Path, mtime_secs: u64) {
    let mtime = UNIX_EPOCH + std::time::Duration::from_secs(mtime_secs);
    let result = std::fs::File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(mtime));
    if let Err(e) = result {
        tracing::debug!(path = %path.display(), error = %e, "failed to carry over mtime");
    }
}

async fn delete_file(ctx: &SyncContext, root: &Path, rel: &str) -> Result<(), TransferError> {
    tokio::fs::remove_file(rel_to_path(root, rel))
        .await
        .map_err(|e| TransferError::file(rel, e))?;
    ctx.stats.add_delete();
    ctx.emit(TransferEvent::new(rel, TransferAction::Delete, "deleted"));
    Ok(())
}

/// One-way tree sync: copy changed/new files from `src_root` to `dst_root`.
async fn one_way(ctx: &SyncContext, src_root: &Path, dst_root: &Path) -> Result<(), TransferError> {
    let src_entries = scan_tree(src_root).await?;
    let dst_entries = scan_tree_or_empty(dst_root).await?;

    for meta in src_entries.values() {
        ctx.stats.add_totals(1, meta.size);
    }
    tokio::fs::create_dir_all(dst_root).await?;

    for (rel, meta) in &src_entries {
        ctx.check_cancelled()?;
        if dst_entries.get(rel) == Some(meta) {
            ctx.emit(TransferEvent::new(rel.as_str(), TransferAction::Skip, "unchanged"));
            continue;
        }
        let from =
            if src_entries.len() == 1 && src_root.is_file() {
                src_root.to_path_buf()
            } else {
                rel_to_path(src_root, rel)
            };
        copy_file(ctx, &from, &rel_to_path(dst_root, rel), rel, *meta).await?;
    }
    Ok(())
}

async fn resolve_conflict(
    ctx: &SyncContext,
    local_root: &Path,
    remote_root: &Path,
    rel: &str,
    local: FileMeta,
    remote: FileMeta,
    policy: ConflictResolution,
) -> Result<(), TransferError> {
    match policy {
        ConflictResolution::Newer => {
            // Ties prefer the local copy.
            let (newer_root, older_root, newer_meta) = if remote.mtime_secs > local.mtime_secs {
                (remote_root, local_root, remote)
            } else {
                (local_root, remote_root, local)
            };
            let renamed = format!("{rel}.old");
            tokio::fs::rename(rel_to_path(older_root, rel), rel_to_path(older_root, &renamed))
                .await
                .map_err(|e| TransferError::file(rel, e))?;
            ctx.emit(TransferEvent::new(
                rel,
                TransferAction::Check,
                format!("conflict: renamed older copy to {renamed}"),
            ));
            ctx.stats.add_totals(1, newer_meta.size);
            copy_file(
                ctx,
                &rel_to_path(newer_root, rel),
                &rel_to_path(older_root, rel),
                rel,
                newer_meta,
            )
            .await
        }
        ConflictResolution::Local => {
            delete_file(ctx, remote_root, rel).await?;
            ctx.stats.add_totals(1, local.size);
            copy_file(ctx, &rel_to_path(local_root, rel), &rel_to_path(remote_root, rel), rel, local)
                .await
        }
        ConflictResolution::Remote => {
            delete_file(ctx, local_root, rel).await?;
            ctx.stats.add_totals(1, remote.size);
            copy_file(ctx, &rel_to_path(remote_root, rel), &rel_to_path(local_root, rel), rel, remote)
                .await
        }
        ConflictResolution::Both => {
            let renamed = format!("{rel}.conflict");
            tokio::fs::rename(rel_to_path(remote_root, rel), rel_to_path(remote_root, &renamed))
                .await
                .map_err(|e| TransferError::file(rel, e))?;
            ctx.emit(TransferEvent::new(
                rel,
                TransferAction::Check,
                format!("conflict: keeping both, remote copy renamed to {renamed}"),
            ));
            ctx.stats.add_totals(2, local.size + remote.size);
            copy_file(
                ctx,
                &rel_to_path(remote_root, &renamed),
                &rel_to_path(local_root, &renamed),
                &renamed,
                remote,
            )
            .await?;
            copy_file(ctx, &rel_to_path(local_root, rel), &rel_to_path(remote_root, rel), rel, local)
                .await
        }
    }
}

#[async_trait]
impl RemoteFs for LocalFs {
    async fn sync_from_local(&self, ctx: &SyncContext, local: &Path) -> Result<(), TransferError> {
        one_way(ctx, local, &self.base).await
    }

    async fn sync_to_local(&self, ctx: &SyncContext, local: &Path) -> Result<(), TransferError> {
        one_way(ctx, &self.base, local).await
    }

    async fn bisync(
        &self,
        ctx: &SyncContext,
        local: &Path,
        conflict: ConflictResolution,
    ) -> Result<(), TransferError> {
        let local_entries = scan_tree(local).await?;
        tokio::fs::create_dir_all(&self.base).await?;
        let remote_entries = scan_tree_or_empty(&self.base).await?;

        for (rel, lmeta) in &local_entries {
            ctx.check_cancelled()?;
            match remote_entries.get(rel) {
                None => {
                    ctx.stats.add_totals(1, lmeta.size);
                    copy_file(ctx, &rel_to_path(local, rel), &rel_to_path(&self.base, rel), rel, *lmeta)
                        .await?;
                }
                Some(rmeta) if rmeta == lmeta => {
                    ctx.emit(TransferEvent::new(rel.as_str(), TransferAction::Check, "in sync"));
                }
                Some(rmeta) => {
                    resolve_conflict(ctx, local, &self.base, rel, *lmeta, *rmeta, conflict).await?;
                }
            }
        }
        for (rel, rmeta) in &remote_entries {
            if local_entries.contains_key(rel) {
                continue;
            }
            ctx.check_cancelled()?;
            ctx.stats.add_totals(1, rmeta.size);
            copy_file(ctx, &rel_to_path(&self.base, rel), &rel_to_path(local, rel), rel, *rmeta)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
