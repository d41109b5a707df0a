// LogSleuth - core/miner_actor.rs
//
// Single-writer actor wrapper around `TemplateMiner` (§5).
//
// Architecture:
//   - The miner owns its parse tree exclusively on one dedicated OS thread,
//     keeping parse-tree mutation off the async executor entirely, so a
//     slow or panicking parse never stalls request handling.
//   - Every `add_log_message` call is a request sent down a bounded
//     `std::sync::mpsc` channel together with a one-shot reply channel.
//   - Async HTTP handlers await the reply off the executor's blocking pool
//     (`tokio::task::spawn_blocking`) so the miner thread itself never
//     touches async machinery and is never suspended mid-parse.
//   - A request that panics the miner (a malformed regex match, an
//     unreachable index) is caught with `catch_unwind` and degrades to a
//     deterministic fallback template rather than taking the actor down.

use crate::core::miner::{MinerConfig, TemplateMiner};
use sha2::{Digest, Sha256};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

/// Bound on the request channel; a burst larger than this blocks the
/// submitting `spawn_blocking` task rather than growing memory without end.
const REQUEST_CHANNEL_CAPACITY: usize = 1_024;

struct MinerRequest {
    message: String,
    reply: mpsc::Sender<ActorOutcome>,
}

/// The miner's verdict on one line, as seen outside the actor boundary.
/// `template_id` is rendered to a string here (rather than the miner's
/// internal `u64`) because a fallback verdict has no numeric cluster id.
#[derive(Debug, Clone)]
pub struct ActorOutcome {
    pub template_id: String,
    pub template_string: String,
    pub cluster_size: u64,
}

/// Handle held by callers; cloneable so every HTTP handler task can submit
/// independently while the miner itself stays single-threaded.
#[derive(Clone)]
pub struct MinerHandle {
    tx: SyncSender<MinerRequest>,
}

impl MinerHandle {
    /// Submit one line to the miner and block until its verdict returns.
    /// Callers on an async runtime must wrap this in `spawn_blocking`.
    pub fn add_log_message(&self, message: &str) -> ActorOutcome {
        let (reply_tx, reply_rx) = mpsc::channel();
        let request = MinerRequest {
            message: message.to_string(),
            reply: reply_tx,
        };
        if self.tx.send(request).is_err() {
            return fallback_outcome(message);
        }
        reply_rx.recv().unwrap_or_else(|_| fallback_outcome(message))
    }
}

/// Spawn the miner's dedicated thread and return a handle to it.
pub fn spawn(config: MinerConfig) -> MinerHandle {
    let (tx, rx): (SyncSender<MinerRequest>, Receiver<MinerRequest>) =
        mpsc::sync_channel(REQUEST_CHANNEL_CAPACITY);
    thread::Builder::new()
        .name("logsleuth-miner".to_string())
        .spawn(move || run_miner(config, rx))
        .expect("failed to spawn miner thread");
    MinerHandle { tx }
}

fn run_miner(config: MinerConfig, rx: Receiver<MinerRequest>) {
    let mut miner = TemplateMiner::new(config);
    while let Ok(request) = rx.recv() {
        let outcome = match catch_unwind(AssertUnwindSafe(|| miner.add_log_message(&request.message))) {
            Ok(outcome) => ActorOutcome {
                template_id: outcome.template_id.to_string(),
                template_string: outcome.template_string,
                cluster_size: outcome.cluster_size,
            },
            Err(_) => {
                tracing::warn!(
                    target: "logsleuth::miner",
                    "miner panicked on a line, degrading to fallback template"
                );
                fallback_outcome(&request.message)
            }
        };
        let _ = request.reply.send(outcome);
    }
}

/// Deterministic pseudo-template for a line the miner could not process:
/// `fallback_` followed by the first 8 hex characters of the message's
/// SHA-256 digest, so the same failing line always maps to the same id.
pub(crate) fn fallback_outcome(message: &str) -> ActorOutcome {
    let digest = Sha256::digest(message.as_bytes());
    let hex = format!("{digest:x}");
    ActorOutcome {
        template_id: format!("fallback_{}", &hex[..8]),
        template_string: message.to_string(),
        cluster_size: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_assigns_same_template_to_structurally_identical_lines() {
        let handle = spawn(MinerConfig::default());
        let a = handle.add_log_message("User 1 logged in");
        let b = handle.add_log_message("User 2 logged in");
        assert_eq!(a.template_id, b.template_id);
    }

    #[test]
    fn fallback_outcome_is_deterministic_for_same_message() {
        let a = fallback_outcome("some line");
        let b = fallback_outcome("some line");
        assert_eq!(a.template_id, b.template_id);
        assert!(a.template_id.starts_with("fallback_"));
        assert_eq!(a.template_id.len(), "fallback_".len() + 8);
    }
}
