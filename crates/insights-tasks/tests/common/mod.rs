//! Stub processors and polling helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use insights_tasks::processor::{ProcessorRegistry, StepError, StepInput, StepProcessor};
use insights_tasks::store::memory::InMemoryTaskStore;
use insights_tasks::{Scheduler, StepKind, TaskRecord};
use serde_json::{json, Value};

/// Returns a fixed payload.
pub struct Fixed {
    pub kind: StepKind,
    pub payload: Value,
}

#[async_trait]
impl StepProcessor for Fixed {
    fn kind(&self) -> StepKind {
        self.kind
    }

    async fn process(&self, _input: StepInput<'_>) -> Result<Value, StepError> {
        Ok(self.payload.clone())
    }
}

/// Always reports an error.
pub struct Failing {
    pub kind: StepKind,
    pub message: &'static str,
}

#[async_trait]
impl StepProcessor for Failing {
    fn kind(&self) -> StepKind {
        self.kind
    }

    async fn process(&self, _input: StepInput<'_>) -> Result<Value, StepError> {
        Err(StepError::Failed(self.message.to_string()))
    }
}

/// Panics when run.
pub struct Panicking(pub StepKind);

#[async_trait]
impl StepProcessor for Panicking {
    fn kind(&self) -> StepKind {
        self.0
    }

    async fn process(&self, _input: StepInput<'_>) -> Result<Value, StepError> {
        panic!("processor exploded");
    }
}

/// Sleeps before returning `{"slept_ms": ..}`.
pub struct Sleeping {
    pub kind: StepKind,
    pub delay: Duration,
}

#[async_trait]
impl StepProcessor for Sleeping {
    fn kind(&self) -> StepKind {
        self.kind
    }

    async fn process(&self, _input: StepInput<'_>) -> Result<Value, StepError> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({ "slept_ms": self.delay.as_millis() as u64 }))
    }
}

/// Reports what it was given: target, parameters and the kinds of prior
/// results, plus a per-processor call counter.
pub struct Inspect {
    pub kind: StepKind,
    pub keys: Option<&'static [&'static str]>,
    pub calls: AtomicUsize,
}

impl Inspect {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            keys: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_keys(kind: StepKind, keys: &'static [&'static str]) -> Self {
        Self {
            keys: Some(keys),
            ..Self::new(kind)
        }
    }
}

#[async_trait]
impl StepProcessor for Inspect {
    fn kind(&self) -> StepKind {
        self.kind
    }

    fn parameter_keys(&self) -> Option<&'static [&'static str]> {
        self.keys
    }

    async fn process(&self, input: StepInput<'_>) -> Result<Value, StepError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let prior: Vec<&str> = input.prior.keys().map(|k| k.as_str()).collect();
        Ok(json!({
            "task_id": input.task_id,
            "target": input.target,
            "step": input.step,
            "parameters": input.parameters,
            "prior": prior,
            "call": call,
        }))
    }
}

pub fn scheduler_with(processors: Vec<Arc<dyn StepProcessor>>) -> Scheduler {
    let registry = processors
        .into_iter()
        .fold(ProcessorRegistry::new(), ProcessorRegistry::with_processor);
    Scheduler::new(Arc::new(InMemoryTaskStore::new()), registry)
}

pub fn fixed(kind: StepKind, payload: Value) -> Arc<dyn StepProcessor> {
    Arc::new(Fixed { kind, payload })
}

pub fn failing(kind: StepKind, message: &'static str) -> Arc<dyn StepProcessor> {
    Arc::new(Failing { kind, message })
}

/// Polls until the task reaches a terminal status or two seconds pass.
pub async fn wait_terminal(scheduler: &Scheduler, task_id: &str) -> TaskRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let record = scheduler.status(task_id).await.unwrap();
        if record.status.is_terminal() {
            return record;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {task_id} still processing"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
