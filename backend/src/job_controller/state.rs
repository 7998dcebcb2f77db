//! Manages the state of background scan jobs.
//!
//! A scan started over HTTP runs outside the request/response cycle (see
//! `services/scan/start.rs`). This module holds everything a later request
//! needs to observe or steer it:
//! - `JobsState`: clonable, thread-safe registry injected into the Actix app.
//! - `JobUpdate`: a status change sent by a running job.
//! - `start_job_updater`: the task that applies `JobUpdate`s to the registry.

use crate::inventory::control::CancellationToken;
use common::jobs::JobStatus;
use std::path::PathBuf;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// Shared state of all scan jobs.
#[derive(Clone)]
pub struct JobsState {
    /// Current status per job id. The updater task is the only writer once a
    /// job has been registered.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Cancellation handles of jobs that have not finished yet.
    pub cancels: Arc<RwLock<HashMap<String, CancellationToken>>>,

    /// CSV report written by each finished job.
    pub reports: Arc<RwLock<HashMap<String, PathBuf>>>,

    /// Jobs push their `JobUpdate`s here instead of locking `jobs` directly.
    pub tx: mpsc::Sender<JobUpdate>,
}

impl JobsState {
    pub fn new(tx: mpsc::Sender<JobUpdate>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            cancels: Arc::new(RwLock::new(HashMap::new())),
            reports: Arc::new(RwLock::new(HashMap::new())),
            tx,
        }
    }
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

/// Applies status updates until every sender is dropped.
///
/// A finished job keeps its final status: late progress updates are ignored,
/// and its cancellation handle is released.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let finished = update.status.is_finished();
        {
            let mut jobs = state.jobs.write().await;
            if jobs.get(&update.job_id).is_some_and(JobStatus::is_finished) {
                continue;
            }
            jobs.insert(update.job_id.clone(), update.status);
        }
        if finished {
            state.cancels.write().await.remove(&update.job_id);
        }
    }
}
