use crate::classify::{is_media, ParsedPath};
use crate::engine::RenameEngine;
use crate::metadata::MetadataReader;
use crate::resolver::TimestampSource;
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub input: PathBuf,
    pub recursive: bool,
    pub include_hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenameCandidate {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub source: Option<TimestampSource>,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RenameStats {
    pub scanned_files: usize,
    pub media_files: usize,
    pub skipped_unsupported: usize,
    pub skipped_hidden: usize,
    pub planned: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub input_root: PathBuf,
    pub candidates: Vec<RenameCandidate>,
    pub stats: RenameStats,
}

impl RenamePlan {
    pub fn changed(&self) -> impl Iterator<Item = &RenameCandidate> {
        self.candidates.iter().filter(|c| c.changed)
    }
}

pub fn generate_plan<R: MetadataReader>(
    options: &PlanOptions,
    engine: &mut RenameEngine<R>,
) -> Result<RenamePlan> {
    if !options.input.is_dir() {
        anyhow::bail!("入力フォルダが存在しません: {}", options.input.display());
    }

    let mut stats = RenameStats::default();
    let media_files = collect_media_files(
        &options.input,
        options.recursive,
        options.include_hidden,
        &mut stats,
    )?;

    let mut candidates = Vec::with_capacity(media_files.len());
    for path in media_files {
        let outcome = engine.rename(&path);
        let changed = outcome.changed();
        if !changed {
            stats.unchanged += 1;
        }
        stats.planned += 1;
        candidates.push(RenameCandidate {
            original_path: outcome.original_path,
            target_path: outcome.target_path,
            source: outcome.source,
            changed,
        });
    }

    info!(
        "計画作成: {} 件中 {} 件を変更予定",
        stats.planned,
        stats.planned - stats.unchanged
    );

    Ok(RenamePlan {
        input_root: options.input.clone(),
        candidates,
        stats,
    })
}

fn collect_media_files(
    root: &Path,
    recursive: bool,
    include_hidden: bool,
    stats: &mut RenameStats,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    if recursive {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                include_hidden
                    || entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !is_hidden(entry.path())
            });
        for entry in walker {
            let entry =
                entry.with_context(|| format!("フォルダ走査に失敗しました: {}", root.display()))?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
    } else {
        for entry in fs::read_dir(root)
            .with_context(|| format!("フォルダを読めませんでした: {}", root.display()))?
        {
            let entry =
                entry.with_context(|| format!("エントリ読み取り失敗: {}", root.display()))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
    }

    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        stats.scanned_files += 1;
        if !include_hidden && is_hidden(&path) {
            stats.skipped_hidden += 1;
            continue;
        }
        match ParsedPath::parse(&path) {
            Some(parsed) if is_media(&parsed) => {
                stats.media_files += 1;
                out.push(path);
            }
            _ => stats.skipped_unsupported += 1,
        }
    }

    Ok(out)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
