//! Tolerate-and-continue batch execution.
//!
//! Every stage maps a pure per-file function over its discovered inputs. A
//! failing item is logged at its severity and recorded; it never stops the
//! batch. Items run on a bounded rayon pool and their outcomes are reduced
//! once at the end, so no counter is shared between workers.
//!
//! Outputs are named after the input stem, so the stem is the item key. When
//! several inputs share a stem only the first (in path order) is dispatched;
//! the rest fail with [`FpsynthError::DuplicateStem`].

mod report;

pub use report::{ratio, ItemFailure, StageReport, StageStats};

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use rayon::prelude::*;

use crate::discover::stem_string;
use crate::error::{FpsynthError, Severity};

/// Cooperative cancellation flag shared between a caller and a running batch.
///
/// Cancelling stops new items from being dispatched; items already running
/// finish normally.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Execution options shared by all batch stages.
#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    /// Worker count. `None` uses the global rayon pool, `Some(1)` runs items
    /// strictly one after another.
    pub jobs: Option<usize>,
    pub cancel: Option<CancelToken>,
}

impl BatchOptions {
    pub fn sequential() -> Self {
        Self {
            jobs: Some(1),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

enum ItemOutcome {
    Succeeded,
    Failed(ItemFailure),
    Cancelled,
}

/// Run `work` over every item and collect a [`StageReport`].
pub fn run_batch<F>(stage: &str, items: &[PathBuf], opts: &BatchOptions, work: F) -> StageReport
where
    F: Fn(&Path) -> Result<(), FpsynthError> + Sync,
{
    let fail = |item: &Path, err: FpsynthError| -> ItemOutcome {
        match err.severity() {
            Severity::Warning => warn!("[{stage}] {}: {err}", item.display()),
            Severity::Error => error!("[{stage}] {}: {err}", item.display()),
        }
        ItemOutcome::Failed(ItemFailure::from_error(stem_string(item), item, &err))
    };

    let process = |item: &Path| -> ItemOutcome {
        if opts.is_cancelled() {
            return ItemOutcome::Cancelled;
        }
        match work(item) {
            Ok(()) => ItemOutcome::Succeeded,
            Err(err) => fail(item, err),
        }
    };

    let mut owners: HashMap<String, &Path> = HashMap::with_capacity(items.len());
    let mut unique: Vec<&Path> = Vec::with_capacity(items.len());
    let mut duplicates = Vec::new();
    for item in items {
        match owners.entry(stem_string(item)) {
            Entry::Occupied(owner) => {
                let err = FpsynthError::DuplicateStem {
                    path: item.clone(),
                    first: owner.get().to_path_buf(),
                };
                duplicates.push(fail(item.as_path(), err));
            }
            Entry::Vacant(slot) => {
                slot.insert(item.as_path());
                unique.push(item.as_path());
            }
        }
    }

    let run_parallel = || unique.par_iter().map(|item| process(*item)).collect::<Vec<_>>();

    let outcomes = match opts.jobs {
        None => run_parallel(),
        Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(run_parallel),
            Err(err) => {
                warn!("[{stage}] could not build a {jobs}-thread pool ({err}); running sequentially");
                unique.iter().map(|item| process(*item)).collect()
            }
        },
    };

    let mut report = StageReport::new(stage);
    report.stats.total = items.len();
    for outcome in outcomes.into_iter().chain(duplicates) {
        match outcome {
            ItemOutcome::Succeeded => report.stats.succeeded += 1,
            ItemOutcome::Failed(failure) => report.failures.push(failure),
            ItemOutcome::Cancelled => report.cancelled += 1,
        }
    }

    info!(
        "{stage} complete: {}/{} succeeded",
        report.stats.succeeded, report.stats.total
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueCode;

    fn items(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("in/item_{i}.min"))).collect()
    }

    #[test]
    fn failures_are_isolated_and_counted() {
        let report = run_batch("convert", &items(5), &BatchOptions::default(), |path| {
            if stem_string(path).ends_with('3') {
                Err(FpsynthError::EmptyResult {
                    path: path.to_path_buf(),
                })
            } else {
                Ok(())
            }
        });

        assert_eq!(report.stats, StageStats::new(4, 5));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, "item_3");
    }

    #[test]
    fn all_failures_still_produce_a_report() {
        let report = run_batch("render", &items(3), &BatchOptions::sequential(), |path| {
            Err(FpsynthError::MissingInput {
                path: path.to_path_buf(),
            })
        });
        assert_eq!(report.stats, StageStats::new(0, 3));
        assert_eq!(report.rate(), 0.0);
        assert_eq!(report.failures.len(), 3);
    }

    #[test]
    fn empty_batch_has_zero_rate() {
        let report = run_batch("extract", &[], &BatchOptions::default(), |_| Ok(()));
        assert_eq!(report.total(), 0);
        assert_eq!(report.rate(), 0.0);
    }

    #[test]
    fn cancellation_stops_dispatch() {
        let cancel = CancelToken::new();
        let opts = BatchOptions::sequential().with_cancel(cancel.clone());

        let report = run_batch("extract", &items(4), &opts, |path| {
            if stem_string(path) == "item_1" {
                cancel.cancel();
            }
            Ok(())
        });

        assert_eq!(report.stats.succeeded, 2);
        assert_eq!(report.cancelled, 2);
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn shared_stems_run_only_the_first_item() {
        let items = vec![
            PathBuf::from("in/a/x.min"),
            PathBuf::from("in/b/x.min"),
            PathBuf::from("in/b/y.min"),
            PathBuf::from("in/c/x.png"),
        ];
        let seen = std::sync::Mutex::new(Vec::new());

        let report = run_batch("convert", &items, &BatchOptions::default(), |path| {
            seen.lock().expect("lock").push(path.to_path_buf());
            Ok(())
        });

        assert_eq!(report.stats, StageStats::new(2, 4));
        assert_eq!(report.count_code(IssueCode::DuplicateStem), 2);
        assert!(report.failures.iter().all(|f| f.item == "x"));

        let mut seen = seen.into_inner().expect("lock");
        seen.sort();
        assert_eq!(seen, vec![PathBuf::from("in/a/x.min"), PathBuf::from("in/b/y.min")]);
    }
}
