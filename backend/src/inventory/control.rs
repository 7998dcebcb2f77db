//! Run-scoped controls shared between the scan driver and its caller:
//! cooperative cancellation and progress reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token for cooperative cancellation of a scan.
///
/// Clone is cheap and shares state. Cancelling stops new extraction calls;
/// calls already in flight run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Progress of a running scan, reported per product and per extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProgress {
    /// PDF files classified so far, out of all PDFs under the root.
    Classifying { done: usize, total: usize },
    /// Extraction calls resolved so far, out of all calls planned.
    Extracting { done: usize, total: usize },
}

impl ScanProgress {
    /// Overall completion in percent; classification is the first half.
    pub fn percent(&self) -> u32 {
        fn share(done: usize, total: usize) -> u32 {
            if total == 0 {
                50
            } else {
                (done.min(total) as f32 / total as f32 * 50.0) as u32
            }
        }
        match *self {
            ScanProgress::Classifying { done, total } => share(done, total),
            ScanProgress::Extracting { done, total } => 50 + share(done, total),
        }
    }
}

type ProgressFn = dyn Fn(ScanProgress) + Send + Sync;

#[derive(Clone, Default)]
pub struct RunControl {
    cancel: CancellationToken,
    progress: Option<Arc<ProgressFn>>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(ScanProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn report(&self, progress: ScanProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}
