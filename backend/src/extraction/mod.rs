//! # Extraction Service
//!
//! Seam between the inventory pipeline and the document-understanding
//! service that reads validity dates out of certificates.
//!
//! The pipeline only sees [`ExtractionService`]. [`document_ai::DocumentAiClient`]
//! is the production implementation; [`cache::CachingExtractor`] wraps any
//! implementation for long-running callers that rescan unchanged folders.
//! Calls are blocking and are issued from a bounded worker pool.

pub mod auth;
pub mod cache;
pub mod document_ai;

use std::path::Path;
use std::time::SystemTime;
use thiserror::Error;

/// A document handed to the service, with the identity used for caching.
pub struct SourceDocument<'a> {
    pub path: &'a Path,
    pub modified_at: SystemTime,
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("cannot read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot obtain access token: {0}")]
    Auth(String),

    #[error("extraction service unreachable: {0}")]
    Transport(String),

    #[error("extraction request timed out after {0}s")]
    Timeout(u64),

    #[error("extraction service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed extraction response: {0}")]
    MalformedResponse(String),

    #[error("extraction skipped: run cancelled")]
    Cancelled,
}

pub trait ExtractionService: Send + Sync {
    /// Returns the validity date found in the document, `Ok(None)` when the
    /// service answered but no usable date was present.
    fn extract_validity_date(
        &self,
        document: &SourceDocument<'_>,
    ) -> Result<Option<String>, ExtractionError>;
}

#[cfg(test)]
pub mod testing {
    //! Scripted service used across the crate's tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    #[derive(Clone, Debug)]
    pub enum Script {
        Date(String),
        NoDate,
        Fail,
    }

    /// Answers by file name; unknown files get `NoDate`.
    #[derive(Default)]
    pub struct ScriptedExtractor {
        scripts: HashMap<String, Script>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedExtractor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, file_name: &str, script: Script) -> Self {
            self.scripts.insert(file_name.to_string(), script);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        pub fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl ExtractionService for ScriptedExtractor {
        fn extract_validity_date(
            &self,
            document: &SourceDocument<'_>,
        ) -> Result<Option<String>, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let name = document
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.seen.lock().unwrap().push(name.clone());
            match self.scripts.get(&name).cloned().unwrap_or(Script::NoDate) {
                Script::Date(date) => Ok(Some(date)),
                Script::NoDate => Ok(None),
                Script::Fail => Err(ExtractionError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }
}
