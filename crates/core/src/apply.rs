use crate::config::app_paths;
use crate::planner::{RenameCandidate, RenamePlan};
use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UndoLog {
    operations: Vec<RenameOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RenameOperation {
    from: PathBuf,
    to: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub applied: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoResult {
    pub restored: usize,
}

pub fn apply_plan(plan: &RenamePlan) -> Result<ApplyResult> {
    apply_plan_with_undo_log(plan, &app_paths()?.undo_path)
}

/// On the first failure, renames already done are reverted and nothing is logged.
pub fn apply_plan_with_undo_log(plan: &RenamePlan, undo_path: &Path) -> Result<ApplyResult> {
    let candidates: Vec<&RenameCandidate> = plan.changed().collect();
    if candidates.is_empty() {
        return Ok(ApplyResult {
            applied: 0,
            unchanged: plan.candidates.len(),
        });
    }

    validate_apply_candidates(&candidates)?;

    let mut operations = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        if let Err(err) = fs::rename(&candidate.original_path, &candidate.target_path) {
            let apply_err = anyhow::Error::from(err).context(format!(
                "リネームに失敗しました: {} -> {}",
                candidate.original_path.display(),
                candidate.target_path.display()
            ));
            if let Err(rollback_err) = rollback(&operations) {
                return Err(apply_err.context(format!(
                    "リネーム失敗後のロールバックにも失敗しました: {rollback_err}"
                )));
            }
            return Err(apply_err);
        }
        operations.push(RenameOperation {
            from: candidate.original_path.clone(),
            to: candidate.target_path.clone(),
        });
    }

    persist_undo(&operations, undo_path)?;
    info!("{} 件をリネームしました", operations.len());

    Ok(ApplyResult {
        applied: operations.len(),
        unchanged: plan.candidates.len().saturating_sub(operations.len()),
    })
}

fn validate_apply_candidates(candidates: &[&RenameCandidate]) -> Result<()> {
    let mut seen_targets = HashSet::<String>::new();

    for candidate in candidates {
        if !candidate.original_path.exists() {
            bail!(
                "元ファイルが見つかりません: {}",
                candidate.original_path.display()
            );
        }
        if candidate.target_path.exists() {
            bail!(
                "リネーム先が既に存在します: {}",
                candidate.target_path.display()
            );
        }
        let key = candidate.target_path.to_string_lossy().to_lowercase();
        if !seen_targets.insert(key) {
            bail!(
                "重複したリネーム先が含まれています: {}",
                candidate.target_path.display()
            );
        }
    }

    Ok(())
}

fn rollback(done: &[RenameOperation]) -> Result<()> {
    for op in done.iter().rev() {
        fs::rename(&op.to, &op.from).with_context(|| {
            format!(
                "ロールバックに失敗しました: {} -> {}",
                op.to.display(),
                op.from.display()
            )
        })?;
    }
    Ok(())
}

pub fn undo_last() -> Result<UndoResult> {
    undo_from_log(&app_paths()?.undo_path)
}

pub fn undo_from_log(undo_path: &Path) -> Result<UndoResult> {
    if !undo_path.exists() {
        bail!("取り消し可能な履歴がありません");
    }

    let raw = fs::read_to_string(undo_path)
        .with_context(|| format!("取り消しログを読めませんでした: {}", undo_path.display()))?;
    let log = serde_json::from_str::<UndoLog>(&raw).context("取り消しログが壊れています")?;

    let restored = restore_operations(&log)?;

    fs::remove_file(undo_path).with_context(|| {
        format!("取り消しログ削除に失敗しました: {}", undo_path.display())
    })?;

    Ok(UndoResult { restored })
}

fn restore_operations(log: &UndoLog) -> Result<usize> {
    let mut restored = 0usize;
    for op in log.operations.iter().rev() {
        if !op.to.exists() || op.from.exists() {
            continue;
        }
        fs::rename(&op.to, &op.from).with_context(|| {
            format!(
                "取り消しに失敗しました: {} -> {}",
                op.to.display(),
                op.from.display()
            )
        })?;
        restored += 1;
    }
    Ok(restored)
}

fn persist_undo(operations: &[RenameOperation], undo_path: &Path) -> Result<()> {
    if let Some(dir) = undo_path.parent() {
        fs::create_dir_all(dir).with_context(|| {
            format!("設定ディレクトリ作成に失敗しました: {}", dir.display())
        })?;
    }

    let log = UndoLog {
        operations: operations.to_vec(),
    };
    let body =
        serde_json::to_string_pretty(&log).context("取り消しログのシリアライズに失敗しました")?;
    fs::write(undo_path, body).with_context(|| {
        format!("取り消しログ書き込みに失敗しました: {}", undo_path.display())
    })?;
    Ok(())
}
