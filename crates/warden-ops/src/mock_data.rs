//! In-process stand-ins for the external collaborators.
//!
//! Nothing here contacts a real system. The model returns a canned review,
//! the directory is a fixed set of actors, and queued actions are published
//! to a recorder. Every mock counts its calls so tests can assert that a
//! guardrail stopped work before it reached the collaborator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use warden_contracts::{
    action::QueuedAction,
    actor::{Actor, ActorId, Role},
    error::{GuardError, GuardResult},
};
use warden_core::traits::{ActionSource, ActorDirectory, ArtifactPublisher, ModelClient};

// ── Model ─────────────────────────────────────────────────────────────────────

/// The review the mock model returns unless told otherwise.
pub fn sample_review() -> String {
    json!({
        "functionality_score": 9,
        "code_quality_score": 8,
        "security_score": 9,
        "performance_score": 8,
        "ecl_score": 0.85,
        "overall_assessment": "High-quality code with clear error handling",
        "strengths": ["Clear error handling", "Well-documented"],
        "weaknesses": ["Could add more edge case tests"],
        "security_issues": [],
        "recommended_changes": ["Add input validation for edge cases"],
        "recommended_status": "approved"
    })
    .to_string()
}

/// A scripted model.
///
/// The first `fail_first` calls return `Transient`; later calls return
/// `response`.
pub struct MockModel {
    response: String,
    fail_first: u32,
    latency: Option<Duration>,
    calls: AtomicU32,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            response: sample_review(),
            fail_first: 0,
            latency: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = response.into();
        self
    }

    pub fn failing_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    /// Sleep this long on every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `call_model` invocations so far, failed ones included.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModel {
    async fn call_model(&self, _prompt: &str) -> GuardResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if call < self.fail_first {
            return Err(GuardError::transient(format!(
                "model endpoint unavailable (call {})",
                call + 1
            )));
        }
        Ok(self.response.clone())
    }
}

// ── Actor directory ───────────────────────────────────────────────────────────

/// A fixed identity store.
pub struct StaticActorDirectory {
    actors: Mutex<HashMap<ActorId, Actor>>,
}

impl StaticActorDirectory {
    pub fn new() -> Self {
        Self {
            actors: Mutex::new(HashMap::new()),
        }
    }

    /// One actor per role:
    ///
    /// | id         | handle                 | role      |
    /// |------------|------------------------|-----------|
    /// | `user_001` | admin@example.com      | admin     |
    /// | `user_002` | developer@example.com  | developer |
    /// | `user_003` | viewer@example.com     | viewer    |
    pub fn seeded() -> Self {
        let directory = Self::new();
        directory.insert(Actor::new("user_001", "admin@example.com", vec![Role::Admin]));
        directory.insert(Actor::new("user_002", "developer@example.com", vec![Role::Developer]));
        directory.insert(Actor::new("user_003", "viewer@example.com", vec![Role::Viewer]));
        directory
    }

    pub fn insert(&self, actor: Actor) {
        let mut actors = self.actors.lock().unwrap_or_else(|p| p.into_inner());
        actors.insert(actor.id.clone(), actor);
    }

    /// Returns false when `id` is unknown.
    pub fn set_active(&self, id: &ActorId, active: bool) -> bool {
        let mut actors = self.actors.lock().unwrap_or_else(|p| p.into_inner());
        match actors.get_mut(id) {
            Some(actor) => {
                actor.active = active;
                true
            }
            None => false,
        }
    }
}

impl Default for StaticActorDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorDirectory for StaticActorDirectory {
    fn get_actor(&self, id: &ActorId) -> Option<Actor> {
        let actors = self.actors.lock().unwrap_or_else(|p| p.into_inner());
        actors.get(id).cloned()
    }

    fn mark_active(&self, id: &ActorId) {
        let mut actors = self.actors.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(actor) = actors.get_mut(id) {
            actor.last_active_at = Some(Utc::now());
        }
    }
}

// ── Execution queue ───────────────────────────────────────────────────────────

/// Three pending actions of different kinds.
pub fn sample_actions() -> Vec<QueuedAction> {
    vec![
        QueuedAction {
            kind: "issue".to_string(),
            target: "acme/payments".to_string(),
            title: "Add retry budget to settlement client".to_string(),
            description: "Settlement calls fail hard on the first 503.".to_string(),
            priority: "high".to_string(),
        },
        QueuedAction {
            kind: "pull_request".to_string(),
            target: "acme/payments".to_string(),
            title: "Bump serde to 1.0.200".to_string(),
            description: "Routine dependency update.".to_string(),
            priority: "low".to_string(),
        },
        QueuedAction {
            kind: "discussion".to_string(),
            target: "acme/architecture".to_string(),
            title: "Audit log retention policy".to_string(),
            description: "Decide how long JSONL audit files are kept.".to_string(),
            priority: "medium".to_string(),
        },
    ]
}

pub struct StaticActionSource {
    actions: Vec<QueuedAction>,
    fetches: AtomicU32,
}

impl StaticActionSource {
    pub fn new(actions: Vec<QueuedAction>) -> Self {
        Self {
            actions,
            fetches: AtomicU32::new(0),
        }
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionSource for StaticActionSource {
    async fn fetch_queued_actions(&self) -> GuardResult<Vec<QueuedAction>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.actions.clone())
    }
}

/// Records every artifact it is asked to create and hands back a
/// `mock://{kind}/{n}` reference.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    created: Arc<Mutex<Vec<QueuedAction>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<QueuedAction> {
        self.created.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl ArtifactPublisher for RecordingPublisher {
    async fn create_artifact(&self, action: &QueuedAction) -> GuardResult<String> {
        let mut created = self.created.lock().unwrap_or_else(|p| p.into_inner());
        created.push(action.clone());
        Ok(format!("mock://{}/{}", action.kind, created.len()))
    }
}
