use crate::{
    catalog::{self, ModEntry, ModState},
    config::ManagerConfig,
    linker,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Applied,
    Reverted,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemLog {
    pub name: String,
    pub outcome: ItemOutcome,
    pub message: String,
}

/// Aggregate result of one apply/revert batch. Skipped items count as
/// neither success nor failure.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub log: Vec<ItemLog>,
}

impl BatchReport {
    fn push(&mut self, name: &str, outcome: ItemOutcome, message: impl Into<String>) {
        self.log.push(ItemLog {
            name: name.to_string(),
            outcome,
            message: message.into(),
        });
    }
}

fn index_by_name(catalog: &[ModEntry]) -> HashMap<&str, &ModEntry> {
    catalog
        .iter()
        .map(|entry| (entry.name.as_str(), entry))
        .collect()
}

/// Links every requested mod that is not already present at the destination.
/// Works off the one catalog snapshot passed in; no re-discovery mid-batch.
/// Anything already installed — broken links included — is skipped silently;
/// a broken link is never auto-repaired here. A failing item never aborts
/// the rest of the batch.
pub fn apply_selection(catalog: &[ModEntry], names: &[String]) -> BatchReport {
    let by_name = index_by_name(catalog);
    let mut report = BatchReport::default();

    for name in names {
        let Some(entry) = by_name.get(name.as_str()) else {
            report.push(name, ItemOutcome::Skipped, "not in source");
            continue;
        };
        if entry.state != ModState::NotInstalled {
            continue;
        }
        match linker::create_link(&entry.source_path, &entry.dest_path) {
            Ok(()) => {
                report.succeeded += 1;
                report.push(name, ItemOutcome::Applied, "OK");
            }
            Err(err) => {
                report.failed += 1;
                report.push(name, ItemOutcome::Failed, err.to_string());
            }
        }
    }

    info!(
        "apply: {} ok, {} failed, {} logged",
        report.succeeded,
        report.failed,
        report.log.len()
    );
    report
}

/// Unlinks every requested mod that is present at the destination. Broken
/// entries are revertible; removal operates on the link, not its target.
pub fn revert_selection(catalog: &[ModEntry], names: &[String]) -> BatchReport {
    let by_name = index_by_name(catalog);
    let mut report = BatchReport::default();

    for name in names {
        let Some(entry) = by_name.get(name.as_str()) else {
            continue;
        };
        if !entry.is_present() {
            continue;
        }
        match linker::remove_link(&entry.dest_path) {
            Ok(()) => {
                report.succeeded += 1;
                report.push(name, ItemOutcome::Reverted, "OK");
            }
            Err(err) => {
                report.failed += 1;
                report.push(name, ItemOutcome::Failed, err.to_string());
            }
        }
    }

    info!(
        "revert: {} ok, {} failed",
        report.succeeded, report.failed
    );
    report
}

/// Toggle decision for a whole selection: revert only when every member is
/// cleanly installed. Broken members force an apply pass, and an empty
/// selection never reverts.
pub fn should_revert(catalog: &[ModEntry], names: &[String]) -> bool {
    if names.is_empty() {
        return false;
    }
    let by_name = index_by_name(catalog);
    names.iter().all(|name| {
        by_name
            .get(name.as_str())
            .map_or(false, |entry| entry.state == ModState::Installed)
    })
}

/// Explicit repair: removes every destination link whose source is gone.
pub fn remove_broken(config: &ManagerConfig) -> BatchReport {
    let broken = catalog::list_broken(config);
    let names: Vec<String> = broken.iter().map(|entry| entry.name.clone()).collect();
    revert_selection(&broken, &names)
}
