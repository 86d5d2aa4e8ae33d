//! Batch state machine, events, and the cancellation flag.
//!
//! [`BatchEvent`]s are the only thing the worker sends to the UI.  Both
//! sides fold them through [`BatchState::advance`] so the runner and the
//! shell agree on where a batch is without sharing anything but the
//! [`CancelToken`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::conversion::ConversionResult;

// ---------------------------------------------------------------------------
// BatchState
// ---------------------------------------------------------------------------

/// Lifecycle of one batch.
///
/// ```text
/// Pending ──start──▶ Running
///         ──Progress{i < n}──▶ Converting { index: i }
///         ──Progress{n, n}──▶ Running
/// Running / Converting ──Finished──▶ Completed | Cancelled
/// Running / Converting ──worker died──▶ Aborted
/// ```
///
/// `Aborted` is never produced by [`advance`](Self::advance); the UI sets
/// it when the worker thread exits without a `Finished` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    /// Built but not started.
    #[default]
    Pending,

    /// The worker is alive but not inside a file.
    Running,

    /// File `index` (zero-based) is being converted.
    Converting { index: usize },

    /// Every file was attempted.
    Completed,

    /// The loop stopped at a file boundary after a cancel request.
    Cancelled,

    /// The worker thread ended without reporting a summary.
    Aborted,
}

impl BatchState {
    /// The state after `event` has been observed.
    ///
    /// ```
    /// use batch_voice_converter::pipeline::{BatchEvent, BatchState};
    ///
    /// let s = BatchState::Running.advance(&BatchEvent::Progress { current: 1, total: 3 });
    /// assert_eq!(s, BatchState::Converting { index: 1 });
    /// ```
    pub fn advance(self, event: &BatchEvent) -> BatchState {
        if self.is_terminal() {
            return self;
        }
        match event {
            BatchEvent::Progress { current, total } if current < total => {
                BatchState::Converting { index: *current }
            }
            BatchEvent::Progress { .. } => BatchState::Running,
            BatchEvent::FileResult(_) => match self {
                BatchState::Pending => BatchState::Running,
                other => other,
            },
            BatchEvent::Finished(summary) if summary.cancelled => BatchState::Cancelled,
            BatchEvent::Finished(_) => BatchState::Completed,
        }
    }

    /// `true` while the worker may still emit events.
    pub fn is_active(self) -> bool {
        matches!(self, BatchState::Running | BatchState::Converting { .. })
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchState::Completed | BatchState::Cancelled | BatchState::Aborted
        )
    }

    /// Short label for the status line.
    pub fn label(self) -> &'static str {
        match self {
            BatchState::Pending => "Ready",
            BatchState::Running => "Running",
            BatchState::Converting { .. } => "Converting",
            BatchState::Completed => "Done",
            BatchState::Cancelled => "Cancelled",
            BatchState::Aborted => "Aborted",
        }
    }
}

// ---------------------------------------------------------------------------
// BatchEvent / BatchSummary
// ---------------------------------------------------------------------------

/// Totals carried by [`BatchEvent::Finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Files in the job, attempted or not.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// The loop stopped early because of a cancel request.
    pub cancelled: bool,
}

impl BatchSummary {
    /// Files that produced a [`BatchEvent::FileResult`].
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Files never attempted because of cancellation.
    pub fn skipped(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }
}

/// Message from the batch worker to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// Sent before file `current` starts, and once more with
    /// `current == total` after the loop.
    Progress { current: usize, total: usize },

    /// Outcome of one attempted file, in input order.
    FileResult(ConversionResult),

    /// Always the last event of a batch.
    Finished(BatchSummary),
}

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag shared by the UI and the worker.
///
/// The worker checks it once per file boundary; a request already sent to
/// the service is allowed to finish.
#[derive(Debug, Clone, Default)]
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(cancelled: bool) -> BatchEvent {
        BatchEvent::Finished(BatchSummary {
            total: 3,
            succeeded: 1,
            failed: 0,
            cancelled,
        })
    }

    #[test]
    fn default_state_is_pending() {
        assert_eq!(BatchState::default(), BatchState::Pending);
        assert!(!BatchState::Pending.is_active());
    }

    #[test]
    fn progress_moves_into_converting() {
        let s = BatchState::Pending.advance(&BatchEvent::Progress {
            current: 0,
            total: 2,
        });
        assert_eq!(s, BatchState::Converting { index: 0 });
        assert!(s.is_active());
    }

    #[test]
    fn final_progress_returns_to_running() {
        let s = BatchState::Converting { index: 1 }.advance(&BatchEvent::Progress {
            current: 2,
            total: 2,
        });
        assert_eq!(s, BatchState::Running);
    }

    #[test]
    fn finished_picks_terminal_state() {
        assert_eq!(
            BatchState::Running.advance(&finished(false)),
            BatchState::Completed
        );
        assert_eq!(
            BatchState::Running.advance(&finished(true)),
            BatchState::Cancelled
        );
    }

    #[test]
    fn terminal_states_ignore_later_events() {
        let s = BatchState::Completed.advance(&BatchEvent::Progress {
            current: 0,
            total: 1,
        });
        assert_eq!(s, BatchState::Completed);
        assert!(BatchState::Cancelled.is_terminal());
        assert_eq!(BatchState::Aborted.advance(&finished(false)), BatchState::Aborted);
        assert!(!BatchState::Aborted.is_active());
    }

    #[test]
    fn file_result_keeps_converting_index() {
        let r = ConversionResult::failed("a.wav", "no audio");
        let s = BatchState::Converting { index: 4 }.advance(&BatchEvent::FileResult(r));
        assert_eq!(s, BatchState::Converting { index: 4 });
    }

    #[test]
    fn summary_counts_skipped_files() {
        let s = BatchSummary {
            total: 5,
            succeeded: 2,
            failed: 1,
            cancelled: true,
        };
        assert_eq!(s.processed(), 3);
        assert_eq!(s.skipped(), 2);
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn cancel_token_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CancelToken>();
    }
}
