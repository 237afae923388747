//! In-memory bookkeeping of running and finished coordinations, used for
//! progress polling. Entries live until the session is cleaned up.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::types::{DiagnosisRequest, DiagnosisStatus, ModalityKind};

const MODALITY_SHARE: f64 = 0.8;
const FUSION_SHARE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinationStatus {
    Dispatching,
    Fusing,
    Completed,
    /// Every modality failed; the fused result is empty
    Failed,
}

impl CoordinationStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, CoordinationStatus::Completed | CoordinationStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityProgress {
    pub modality: ModalityKind,
    pub status: DiagnosisStatus,
}

/// Snapshot returned to progress pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisProgress {
    pub coordination_id: Uuid,
    pub session_id: String,
    pub status: CoordinationStatus,
    pub modalities: Vec<ModalityProgress>,
    /// Modalities that finished with a usable result
    pub completed: usize,
    /// Modalities that reached any terminal status
    pub finished: usize,
    pub total: usize,
    /// 0.0 to 1.0
    pub progress: f64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
struct CoordinationEntry {
    request: DiagnosisRequest,
    status: CoordinationStatus,
    modalities: Vec<ModalityProgress>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl CoordinationEntry {
    #[allow(clippy::cast_precision_loss)]
    fn snapshot(&self, coordination_id: Uuid) -> DiagnosisProgress {
        let total = self.modalities.len();
        let finished = self.modalities.iter().filter(|m| m.status.is_terminal()).count();
        let completed = self
            .modalities
            .iter()
            .filter(|m| m.status == DiagnosisStatus::Completed)
            .count();

        let modality_progress = if total == 0 {
            MODALITY_SHARE
        } else {
            MODALITY_SHARE * finished as f64 / total as f64
        };
        let fusion_progress = if self.status.is_finished() { FUSION_SHARE } else { 0.0 };

        DiagnosisProgress {
            coordination_id,
            session_id: self.request.session_id.clone(),
            status: self.status,
            modalities: self.modalities.clone(),
            completed,
            finished,
            total,
            progress: modality_progress + fusion_progress,
            started_at: self.started_at,
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionTracker {
    entries: DashMap<Uuid, CoordinationEntry>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new coordination with every modality pending
    pub fn begin(&self, coordination_id: Uuid, request: &DiagnosisRequest) {
        let modalities = request
            .modalities
            .iter()
            .map(|modality| ModalityProgress {
                modality: *modality,
                status: DiagnosisStatus::Pending,
            })
            .collect();

        self.entries.insert(
            coordination_id,
            CoordinationEntry {
                request: request.clone(),
                status: CoordinationStatus::Dispatching,
                modalities,
                started_at: Utc::now(),
                started: Instant::now(),
            },
        );
    }

    pub fn set_modality_status(&self, coordination_id: Uuid, modality: ModalityKind, status: DiagnosisStatus) {
        if let Some(mut entry) = self.entries.get_mut(&coordination_id) {
            if let Some(progress) = entry.modalities.iter_mut().find(|m| m.modality == modality) {
                progress.status = status;
            }
        }
    }

    pub fn set_status(&self, coordination_id: Uuid, status: CoordinationStatus) {
        if let Some(mut entry) = self.entries.get_mut(&coordination_id) {
            entry.status = status;
        }
    }

    pub fn progress(&self, coordination_id: Uuid) -> Option<DiagnosisProgress> {
        self.entries
            .get(&coordination_id)
            .map(|entry| entry.snapshot(coordination_id))
    }

    /// Progress of the most recently started coordination for a session
    pub fn latest_for_session(&self, session_id: &str) -> Option<DiagnosisProgress> {
        self.entries
            .iter()
            .filter(|entry| entry.request.session_id == session_id)
            .max_by_key(|entry| entry.started)
            .map(|entry| entry.snapshot(*entry.key()))
    }

    /// Forget every coordination of a session, returning how many were removed
    pub fn cleanup_session(&self, session_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.request.session_id != session_id);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(session: &str) -> DiagnosisRequest {
        DiagnosisRequest::new(
            "user-1",
            session,
            vec![ModalityKind::Inquiry, ModalityKind::Looking],
        )
    }

    #[test]
    fn test_progress_shares() {
        let tracker = SessionTracker::new();
        let id = Uuid::new_v4();
        tracker.begin(id, &request("s1"));

        let start = tracker.progress(id).unwrap();
        assert_eq!(start.status, CoordinationStatus::Dispatching);
        assert_eq!(start.progress, 0.0);
        assert_eq!(start.total, 2);

        tracker.set_modality_status(id, ModalityKind::Inquiry, DiagnosisStatus::Completed);
        let half = tracker.progress(id).unwrap();
        assert!((half.progress - 0.4).abs() < 1e-9);
        assert_eq!(half.completed, 1);

        tracker.set_modality_status(id, ModalityKind::Looking, DiagnosisStatus::Timeout);
        tracker.set_status(id, CoordinationStatus::Completed);
        let done = tracker.progress(id).unwrap();
        assert!((done.progress - 1.0).abs() < 1e-9);
        assert_eq!(done.completed, 1);
        assert_eq!(done.finished, 2);
    }

    #[test]
    fn test_cleanup_removes_only_that_session() {
        let tracker = SessionTracker::new();
        tracker.begin(Uuid::new_v4(), &request("s1"));
        tracker.begin(Uuid::new_v4(), &request("s1"));
        tracker.begin(Uuid::new_v4(), &request("s2"));

        assert_eq!(tracker.cleanup_session("s1"), 2);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.latest_for_session("s1").is_none());
        assert!(tracker.latest_for_session("s2").is_some());
        assert_eq!(tracker.cleanup_session("unknown"), 0);
    }

    #[test]
    fn test_latest_coordination_wins() {
        let tracker = SessionTracker::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        tracker.begin(first, &request("s1"));
        std::thread::sleep(std::time::Duration::from_millis(2));
        tracker.begin(second, &request("s1"));

        assert_eq!(tracker.latest_for_session("s1").unwrap().coordination_id, second);
    }

    #[test]
    fn test_updates_to_unknown_coordination_ignored() {
        let tracker = SessionTracker::new();
        tracker.set_status(Uuid::new_v4(), CoordinationStatus::Failed);
        assert!(tracker.is_empty());
    }
}
