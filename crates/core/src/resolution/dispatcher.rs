use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::domain::tag::{normalize_tag_name, ResolutionEntry};
use crate::resolution::cache::EntryCache;
use crate::resolution::result::ResolutionResult;
use crate::resolution::similarity::{similarity_ratio, MatchPolicy};

pub const DEFAULT_RESULT_BUFFER: usize = 64;

/// Fans candidates out to one task each and gathers every entry they emit.
#[derive(Clone)]
pub struct MatchDispatcher {
    cache: Arc<EntryCache>,
    policy: MatchPolicy,
    result_buffer: usize,
}

impl MatchDispatcher {
    pub fn new(cache: Arc<EntryCache>, policy: MatchPolicy) -> Self {
        Self { cache, policy, result_buffer: DEFAULT_RESULT_BUFFER }
    }

    pub fn with_result_buffer(mut self, result_buffer: usize) -> Self {
        self.result_buffer = result_buffer.max(1);
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Evaluates every candidate to completion. The result channel closes only after the
    /// coordinator has joined all `candidates.len()` tasks and released its own sender.
    pub async fn dispatch(&self, candidates: Vec<String>) -> ResolutionResult {
        let dispatched = candidates.len();
        let (sender, mut receiver) = mpsc::channel(self.result_buffer);

        let mut tasks = JoinSet::new();
        for candidate in candidates {
            let cache = Arc::clone(&self.cache);
            let sender = sender.clone();
            let policy = self.policy;
            tasks.spawn(async move {
                let produced = evaluate(&cache, policy, &candidate, &sender).await;
                debug!(
                    event_name = "resolution.candidate.evaluated",
                    candidate = %candidate,
                    produced,
                    "candidate evaluated"
                );
                produced
            });
        }

        let coordinator = tokio::spawn(async move {
            let mut completed = 0usize;
            while let Some(joined) = tasks.join_next().await {
                completed += 1;
                if let Err(join_error) = joined {
                    warn!(
                        event_name = "resolution.candidate.aborted",
                        error = %join_error,
                        "candidate task ended abnormally"
                    );
                }
            }
            drop(sender);
            completed
        });

        let mut result = ResolutionResult::collecting(dispatched);
        while let Some(entry) = receiver.recv().await {
            result.push(entry);
        }

        let completed = match coordinator.await {
            Ok(completed) => completed,
            Err(join_error) => {
                error!(
                    event_name = "resolution.dispatch.coordinator_failed",
                    error = %join_error,
                    "completion coordinator ended abnormally"
                );
                0
            }
        };

        let result = result.complete(completed);
        debug!(
            event_name = "resolution.dispatch.completed",
            dispatched,
            completed,
            entry_count = result.entries.len(),
            found = result.found,
            "candidate fan-in complete"
        );
        result
    }
}

async fn evaluate(
    cache: &EntryCache,
    policy: MatchPolicy,
    candidate: &str,
    sender: &mpsc::Sender<ResolutionEntry>,
) -> usize {
    let key = normalize_tag_name(candidate);

    let exact = cache.find(&key).await;
    if !exact.is_empty() {
        return emit(sender, exact).await;
    }
    if !policy.allows_fuzzy(&key) {
        return 0;
    }

    let mut produced = 0;
    for name in cache.names_snapshot().await {
        let ratio = similarity_ratio(&key, &name);
        if !policy.accepts(ratio) {
            continue;
        }
        if ratio >= 1.0 {
            debug!(
                event_name = "resolution.candidate.late_exact",
                candidate = %key,
                "tag appeared between exact lookup and name snapshot"
            );
        }
        produced += emit(sender, cache.find(&name).await).await;
    }
    produced
}

async fn emit(sender: &mpsc::Sender<ResolutionEntry>, entries: Vec<ResolutionEntry>) -> usize {
    let mut sent = 0;
    for entry in entries {
        if sender.send(entry).await.is_err() {
            break;
        }
        sent += 1;
    }
    sent
}
