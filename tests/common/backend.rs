//! In-memory transfer backend driven only through the public API

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use transfer_tracker::{BackendError, JobId, RawStatus, TransferBackend, TransferStatus};
use url::Url;

/// Planned behaviour of one simulated transfer
#[derive(Clone, Debug)]
pub enum Plan {
    /// Advance by `step` bytes per query until `total`, then succeed
    Finish { total: u64, step: u64 },
    /// Advance by `step` bytes per query and fail once `fail_at` is reached
    FailAt { total: u64, step: u64, fail_at: u64 },
    /// Keep running forever without a known total
    Endless { step: u64 },
}

#[derive(Debug)]
struct Transfer {
    plan: Plan,
    downloaded: u64,
    destination: PathBuf,
}

/// Backend that simulates transfers advancing one step per status query
pub struct SimulatedBackend {
    next_id: Mutex<u64>,
    plans: Mutex<Vec<Plan>>,
    transfers: Mutex<HashMap<JobId, Transfer>>,
}

impl SimulatedBackend {
    /// Transfers started later use `plans` in order; the last plan repeats
    pub fn new(plans: Vec<Plan>) -> Self {
        Self {
            next_id: Mutex::new(100),
            plans: Mutex::new(plans),
            transfers: Mutex::new(HashMap::new()),
        }
    }

    /// Destination the transfer was started with
    pub fn destination_of(&self, id: &JobId) -> Option<PathBuf> {
        self.transfers
            .lock()
            .unwrap()
            .get(id)
            .map(|t| t.destination.clone())
    }

    fn next_plan(&self) -> Plan {
        let mut plans = self.plans.lock().unwrap();
        if plans.len() > 1 {
            plans.remove(0)
        } else {
            plans
                .first()
                .cloned()
                .unwrap_or(Plan::Finish { total: 100, step: 25 })
        }
    }
}

#[async_trait]
impl TransferBackend for SimulatedBackend {
    async fn start(&self, _url: &Url, destination: &Path) -> Result<JobId, BackendError> {
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            JobId::from(*next)
        };
        let transfer = Transfer {
            plan: self.next_plan(),
            downloaded: 0,
            destination: destination.to_path_buf(),
        };
        self.transfers.lock().unwrap().insert(id.clone(), transfer);
        Ok(id)
    }

    async fn status(&self, id: &JobId) -> Result<TransferStatus, BackendError> {
        let mut transfers = self.transfers.lock().unwrap();
        let transfer = transfers
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound { id: id.clone() })?;

        let status = match transfer.plan.clone() {
            Plan::Finish { total, step } => {
                transfer.downloaded = (transfer.downloaded + step).min(total);
                let raw = if transfer.downloaded == total {
                    RawStatus::Successful
                } else {
                    RawStatus::Running
                };
                TransferStatus::new(raw, transfer.downloaded, total)
            }
            Plan::FailAt {
                total,
                step,
                fail_at,
            } => {
                transfer.downloaded = (transfer.downloaded + step).min(fail_at);
                let raw = if transfer.downloaded >= fail_at {
                    RawStatus::Failed
                } else {
                    RawStatus::Running
                };
                TransferStatus::new(raw, transfer.downloaded, total)
            }
            Plan::Endless { step } => {
                transfer.downloaded += step;
                TransferStatus::unknown_total(RawStatus::Running, transfer.downloaded)
            }
        };
        Ok(status)
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
