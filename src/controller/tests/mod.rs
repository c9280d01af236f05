use super::test_helpers::*;
use super::*;
use crate::error::{Error, RegistryError};
use crate::types::JobStatus;
use std::time::Duration;


/// Progress values the observer saw for `id`, in delivery order
fn progress_trail(observer: &RecordingObserver, id: &JobId) -> Vec<u8> {
    observer
        .snapshots_for(id)
        .iter()
        .map(|job| job.progress_percent)
        .collect()
}

/// Statuses the observer saw for `id`, in delivery order, with repeats collapsed
fn status_trail(observer: &RecordingObserver, id: &JobId) -> Vec<JobStatus> {
    let mut trail: Vec<JobStatus> = Vec::new();
    for job in observer.snapshots_for(id) {
        if trail.last() != Some(&job.status) {
            trail.push(job.status);
        }
    }
    trail
}
