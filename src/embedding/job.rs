//! Embedding job scheduling, coalescing, and backoff (C5).

use super::rate_limiter::{RateLimiterConfig, TokenBucket};
use super::Embedder;
use crate::graph::BitemporalGraphStore;
use crate::models::EmbeddingRecord;
use crate::storage::traits::graph::GraphBackend;
use crate::storage::traits::vector::VectorIndex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_RETRIES: u32 = 5;
const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 30_000;

/// Lifecycle state of a single scheduled job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    /// Waiting to be drained by `process_jobs`.
    Queued,
    /// Currently being processed.
    InFlight,
    /// The provider call failed; will retry after `next_attempt_at`.
    Retrying {
        /// Number of attempts made so far.
        attempt: u32,
        /// Earliest instant at which a retry may be attempted.
        next_attempt_at: Instant,
    },
    /// Exceeded the retry budget.
    Failed {
        /// Always `true`: the variant only exists once retries are exhausted.
        retries_exhausted: bool,
    },
    /// Completed successfully.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Priority {
    Low,
    Normal,
    High,
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Low,
            2.. => Self::High,
            _ => Self::Normal,
        }
    }
}

struct Job {
    name: String,
    priority: Priority,
    state: JobState,
}

/// Outcome of draining one job, reported per-job rather than only in
/// aggregate (`spec.md` §4.3).
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// The entity name the job embedded.
    pub name: String,
    /// The resulting state after this drain attempt.
    pub state: JobState,
}

struct ManagerState {
    queue: VecDeque<Job>,
    in_flight: std::collections::HashSet<String>,
}

/// Schedules, coalesces, rate-limits, and drains embedding jobs, writing
/// results back through C3 (`update_entity_embedding`) and C4 (`add_vector`).
///
/// Generic over the graph backend, vector index, and embedder so callers can
/// wire in any combination satisfying the respective traits.
pub struct JobManager<B: GraphBackend> {
    store: BitemporalGraphStore<B>,
    vector_index: Arc<Mutex<dyn VectorIndex>>,
    embedder: Arc<dyn Embedder>,
    rate_limiter: TokenBucket,
    state: Mutex<ManagerState>,
}

impl<B: GraphBackend> JobManager<B> {
    /// Creates a job manager with the default rate limiter configuration
    /// (20 tokens / 60s).
    #[must_use]
    pub fn new(store: BitemporalGraphStore<B>, vector_index: Arc<Mutex<dyn VectorIndex>>, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_rate_limit(store, vector_index, embedder, RateLimiterConfig::default())
    }

    /// Creates a job manager with an explicit rate limiter configuration.
    #[must_use]
    pub fn with_rate_limit(
        store: BitemporalGraphStore<B>,
        vector_index: Arc<Mutex<dyn VectorIndex>>,
        embedder: Arc<dyn Embedder>,
        rate_limit: RateLimiterConfig,
    ) -> Self {
        Self {
            store,
            vector_index,
            embedder,
            rate_limiter: TokenBucket::new(rate_limit),
            state: Mutex::new(ManagerState { queue: VecDeque::new(), in_flight: std::collections::HashSet::new() }),
        }
    }

    /// Enqueues an embedding job for `name`. Coalesces with an existing
    /// queued job for the same name, keeping the higher priority; does
    /// nothing if a job for `name` is already in flight.
    pub fn schedule_entity_embedding(&self, name: &str, priority: u8) {
        let priority = Priority::from(priority);
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if state.in_flight.contains(name) {
            tracing::debug!(name, "embedding job already in flight, not re-enqueuing");
            return;
        }

        if let Some(existing) = state.queue.iter_mut().find(|job| job.name == name) {
            if priority > existing.priority {
                existing.priority = priority;
            }
            return;
        }

        state.queue.push_back(Job { name: name.to_string(), priority, state: JobState::Queued });
    }

    /// Drains up to `max_n` jobs, subject to the token-bucket rate limit.
    /// Jobs are taken highest-priority first; a job whose retry backoff has
    /// not elapsed is skipped this round and stays queued.
    pub fn process_jobs(&self, max_n: usize) -> Vec<JobOutcome> {
        let mut outcomes = Vec::with_capacity(max_n);
        let now = Instant::now();

        for _ in 0..max_n {
            if !self.rate_limiter.try_acquire() {
                tracing::trace!("embedding rate limit exhausted, stopping drain early");
                break;
            }

            let Some(job) = self.take_next_ready_job(now) else {
                break;
            };

            let name = job.name.clone();
            let attempt = match &job.state {
                JobState::Retrying { attempt, .. } => *attempt,
                _ => 0,
            };

            match self.run_job(&name) {
                Ok(()) => {
                    self.mark_done(&name);
                    outcomes.push(JobOutcome { name, state: JobState::Done });
                }
                Err(error) => {
                    let outcome_state = self.mark_failed_or_retrying(&name, attempt, &error);
                    tracing::warn!(name = name.as_str(), %error, attempt, "embedding job failed");
                    outcomes.push(JobOutcome { name, state: outcome_state });
                }
            }
        }

        outcomes
    }

    fn take_next_ready_job(&self, now: Instant) -> Option<Job> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let index = state.queue.iter().position(|job| job.is_ready(now))?;
        let mut best = index;
        for (i, job) in state.queue.iter().enumerate() {
            if job.is_ready(now) && job.priority > state.queue[best].priority {
                best = i;
            }
        }
        let job = state.queue.remove(best)?;
        state.in_flight.insert(job.name.clone());
        Some(job)
    }

    fn run_job(&self, name: &str) -> crate::Result<()> {
        let entity = self.store.get_entity(name)?.ok_or_else(|| crate::Error::NotFound(name.to_string()))?;
        let text = entity.observations.join("\n");
        let vector = self.embedder.embed(&text)?;

        let record = EmbeddingRecord {
            vector: vector.clone(),
            provider: "chronograph".to_string(),
            model: format!("dim{}", self.embedder.dimensions()),
            updated_at: crate::models::current_timestamp(),
        };
        self.store.update_entity_embedding(name, record)?;

        let mut tags = HashMap::new();
        tags.insert("entityType".to_string(), entity.entity_type.clone());
        let mut index = self.vector_index.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        index.add_vector(name, &vector, tags)?;
        Ok(())
    }

    fn mark_done(&self, name: &str) {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.in_flight.remove(name);
    }

    fn mark_failed_or_retrying(&self, name: &str, attempt: u32, _error: &crate::Error) -> JobState {
        let next_attempt = attempt + 1;
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.in_flight.remove(name);

        if next_attempt > MAX_RETRIES {
            return JobState::Failed { retries_exhausted: true };
        }

        let backoff_ms = (BASE_BACKOFF_MS.saturating_mul(1u64 << next_attempt.min(6))).min(MAX_BACKOFF_MS);
        let retry_state = JobState::Retrying { attempt: next_attempt, next_attempt_at: Instant::now() + Duration::from_millis(backoff_ms) };
        state.queue.push_back(Job { name: name.to_string(), priority: Priority::Normal, state: retry_state.clone() });
        retry_state
    }

    /// Number of jobs currently queued (not in flight).
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).queue.len()
    }

    /// Number of jobs currently in flight.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).in_flight.len()
    }

    /// Waits, up to `grace_window`, for all in-flight jobs to finish.
    /// Jobs still queued (not in flight) are dropped without being run.
    /// Coordinating actual in-flight completion requires the caller to stop
    /// invoking `process_jobs` concurrently; this only polls the tracked
    /// count.
    pub fn shutdown(&self, grace_window: Duration) {
        let deadline = Instant::now() + grace_window;
        while self.in_flight_len() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.queue.clear();
    }
}

impl Job {
    fn is_ready(&self, now: Instant) -> bool {
        match &self.state {
            JobState::Retrying { next_attempt_at, .. } => now >= *next_attempt_at,
            _ => true,
        }
    }
}

impl Clone for JobState {
    fn clone(&self) -> Self {
        match self {
            Self::Queued => Self::Queued,
            Self::InFlight => Self::InFlight,
            Self::Retrying { attempt, next_attempt_at } => Self::Retrying { attempt: *attempt, next_attempt_at: *next_attempt_at },
            Self::Failed { retries_exhausted } => Self::Failed { retries_exhausted: *retries_exhausted },
            Self::Done => Self::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::FallbackEmbedder;
    use crate::graph::EntityInput;
    use crate::storage::graph::InMemoryGraphBackend;
    use crate::storage::traits::vector::SimilarityFunction;
    use crate::storage::vector::InMemoryVectorIndex;

    fn manager() -> JobManager<InMemoryGraphBackend> {
        let store = BitemporalGraphStore::new(InMemoryGraphBackend::new());
        store.create_entities(vec![EntityInput { name: "alice".into(), entity_type: "person".into(), observations: vec!["likes tea".into()] }]).unwrap();
        let index: Arc<Mutex<dyn VectorIndex>> = Arc::new(Mutex::new(InMemoryVectorIndex::in_memory(0, SimilarityFunction::Cosine)));
        JobManager::new(store, index, Arc::new(FallbackEmbedder::new()))
    }

    #[test]
    fn scheduling_twice_coalesces_into_one_job() {
        let mgr = manager();
        mgr.schedule_entity_embedding("alice", 1);
        mgr.schedule_entity_embedding("alice", 1);
        assert_eq!(mgr.queued_len(), 1);
    }

    #[test]
    fn higher_priority_reschedule_upgrades_queued_job() {
        let mgr = manager();
        mgr.schedule_entity_embedding("alice", 0);
        mgr.schedule_entity_embedding("alice", 2);
        assert_eq!(mgr.queued_len(), 1);
    }

    #[test]
    fn process_jobs_drains_and_reports_done() {
        let mgr = manager();
        mgr.schedule_entity_embedding("alice", 1);
        let outcomes = mgr.process_jobs(10);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, "alice");
        assert_eq!(outcomes[0].state, JobState::Done);
        assert_eq!(mgr.queued_len(), 0);
        assert_eq!(mgr.in_flight_len(), 0);
    }

    #[test]
    fn process_jobs_respects_rate_limit() {
        let store = BitemporalGraphStore::new(InMemoryGraphBackend::new());
        for i in 0..3 {
            store.create_entities(vec![EntityInput { name: format!("e{i}"), entity_type: "x".into(), observations: vec![] }]).unwrap();
        }
        let index: Arc<Mutex<dyn VectorIndex>> = Arc::new(Mutex::new(InMemoryVectorIndex::in_memory(0, SimilarityFunction::Cosine)));
        let mgr = JobManager::with_rate_limit(store, index, Arc::new(FallbackEmbedder::new()), RateLimiterConfig { tokens_per_interval: 2, interval_ms: 60_000 });
        for i in 0..3 {
            mgr.schedule_entity_embedding(&format!("e{i}"), 1);
        }
        let outcomes = mgr.process_jobs(10);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(mgr.queued_len(), 1);
    }

    #[test]
    fn scheduling_while_in_flight_is_a_no_op() {
        let mgr = manager();
        {
            let mut state = mgr.state.lock().unwrap();
            state.in_flight.insert("alice".to_string());
        }
        mgr.schedule_entity_embedding("alice", 1);
        assert_eq!(mgr.queued_len(), 0);
    }
}
