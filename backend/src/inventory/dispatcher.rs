//! # Extraction Dispatcher
//!
//! Turns a category's selection into its result value. Presence categories
//! resolve locally; date categories with a selection read the file and ask
//! the [`ExtractionService`] once.
//!
//! Every outcome is an explicit `Result`; a failed extraction becomes an
//! absent date plus the error for diagnostics, and never stops the run. No
//! call is retried.

use super::classifier::Candidate;
use super::control::CancellationToken;
use crate::extraction::{ExtractionError, ExtractionService, SourceDocument};
use common::model::category::ValueKind;
use common::model::report::ResultValue;
use std::fs;

/// What a category needs after selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The value is known without calling the service.
    Resolved(ResultValue),
    /// The selected document must go through the extraction service.
    Extract(Candidate),
}

pub fn plan(kind: ValueKind, selection: Option<Candidate>) -> Dispatch {
    match (kind, selection) {
        (ValueKind::Presence, selection) => {
            Dispatch::Resolved(ResultValue::Bool(selection.is_some()))
        }
        (ValueKind::ExtractedDate, None) => Dispatch::Resolved(ResultValue::OptionalDate(None)),
        (ValueKind::ExtractedDate, Some(candidate)) => Dispatch::Extract(candidate),
    }
}

/// Reads the selected document and calls the service, unless the run was
/// cancelled first.
pub fn extract(
    service: &dyn ExtractionService,
    candidate: &Candidate,
    mime_type: &str,
    cancel: &CancellationToken,
) -> Result<Option<String>, ExtractionError> {
    if cancel.is_cancelled() {
        return Err(ExtractionError::Cancelled);
    }
    let bytes = fs::read(&candidate.path)?;
    service.extract_validity_date(&SourceDocument {
        path: &candidate.path,
        modified_at: candidate.modified_at,
        bytes: &bytes,
        mime_type,
    })
}

/// A category's value, with the failure that emptied it if any.
#[derive(Debug)]
pub struct Resolution {
    pub value: ResultValue,
    pub failure: Option<ExtractionError>,
}

pub fn resolve(outcome: Result<Option<String>, ExtractionError>) -> Resolution {
    match outcome {
        Ok(date) => Resolution {
            value: ResultValue::OptionalDate(date),
            failure: None,
        },
        Err(e) => Resolution {
            value: ResultValue::OptionalDate(None),
            failure: Some(e),
        },
    }
}
