//! Walk-throughs of the guardrail engine for the demo binary.
//!
//! Each scenario builds a fresh [`Warden`] over an in-memory audit sink and
//! mock collaborators, drives one enforcement pattern, and prints what the
//! trail recorded.

pub mod bypass;
pub mod code_review;
pub mod queued_actions;
pub mod resilience;
pub mod sandbox;

use std::sync::Arc;

use warden_audit::InMemoryAuditSink;
use warden_contracts::{
    actor::{Actor, ActorId},
    config::GuardConfig,
    error::{GuardError, GuardResult},
    workflow::WorkflowResult,
};
use warden_core::traits::ActorDirectory;

use crate::{
    mock_data::{sample_actions, MockModel, RecordingPublisher, StaticActionSource, StaticActorDirectory},
    warden::{Collaborators, OperationSettings, Warden},
};

/// A warden plus handles on everything a scenario inspects afterwards.
pub struct Harness {
    pub warden: Warden,
    pub sink: InMemoryAuditSink,
    pub model: Arc<MockModel>,
    pub publisher: RecordingPublisher,
    pub directory: Arc<StaticActorDirectory>,
}

impl Harness {
    pub fn new(config: GuardConfig, model: MockModel, settings: OperationSettings) -> GuardResult<Self> {
        let sink = InMemoryAuditSink::new();
        let model = Arc::new(model);
        let publisher = RecordingPublisher::new();
        let directory = Arc::new(StaticActorDirectory::seeded());

        let warden = Warden::new(
            config,
            Arc::new(sink.clone()),
            Collaborators {
                model: model.clone(),
                directory: directory.clone(),
                actions: Arc::new(StaticActionSource::new(sample_actions())),
                publisher: Arc::new(publisher.clone()),
            },
            settings,
        )?;

        Ok(Self {
            warden,
            sink,
            model,
            publisher,
            directory,
        })
    }

    /// A seeded actor by id.
    pub fn actor(&self, id: &str) -> GuardResult<Actor> {
        self.directory
            .get_actor(&ActorId::new(id))
            .ok_or_else(|| GuardError::fatal(format!("seeded actor '{id}' missing")))
    }

    /// Print the audit actions recorded so far and the chain status.
    pub fn print_trail(&self) {
        println!("  Audit trail ({} event(s)):", self.sink.len());
        for event in self.sink.events() {
            let outcome = if event.success { "ok" } else { "FAILED" };
            println!(
                "    [{:<8}] {:<26} {:<24} {}",
                format!("{:?}", event.severity).to_lowercase(),
                event.action,
                event.resource,
                outcome
            );
        }
        println!(
            "  Audit chain integrity: {}",
            if self.sink.verify_integrity() { "VERIFIED" } else { "BROKEN" }
        );
    }
}

pub(crate) fn describe(result: &WorkflowResult) -> String {
    match &result.error {
        None => format!(
            "SUCCESS (retries: {}, {} ms)",
            result.retry_count, result.duration_ms
        ),
        Some(err) => format!(
            "FAILED [{}] {} (retries: {})",
            err.kind.as_str(),
            err.message,
            result.retry_count
        ),
    }
}

pub(crate) fn banner(title: &str) {
    println!("=== {title} ===");
    println!();
}
