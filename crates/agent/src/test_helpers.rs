//! Scripted collaborators for pipeline tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use stride_core::{
    AgentError, AgentExecutor, AgentOutput, Context, ContextStore, DiagnosticsSink,
    GenerationError, GenerationRequest, OrchestrationTrace, StoreError, TextGenerator,
    UserSnapshot,
};
use stride_experiments::{EffectiveConfig, ExperimentSelection, ExperimentSource};
use stride_guardian::{RiskAssessment, RiskClassifier, RiskLevel};

use crate::local_agents::LocalAgents;

pub const VALID_TIP: &str =
    r#"{"title":"Pack lunch","message":"Bring lunch three days this week.","category":"budget"}"#;

/// A generator that returns a sequence of scripted replies and records
/// every request it sees.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::NotConfigured("script exhausted".into())))
    }
}

/// A generator that never answers.
pub struct HangingGenerator;

#[async_trait]
impl TextGenerator for HangingGenerator {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
        std::future::pending().await
    }
}

enum Behaviour {
    Fail,
    Hang,
    Panic,
    Slow(Duration, Arc<AtomicBool>),
}

/// Local agents with selected ids replaced by misbehaving ones.
#[derive(Default)]
pub struct ScriptedAgents {
    local: LocalAgents,
    overrides: HashMap<&'static str, Behaviour>,
}

impl ScriptedAgents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, id: &'static str) -> Self {
        self.overrides.insert(id, Behaviour::Fail);
        self
    }

    pub fn hang(mut self, id: &'static str) -> Self {
        self.overrides.insert(id, Behaviour::Hang);
        self
    }

    pub fn panic(mut self, id: &'static str) -> Self {
        self.overrides.insert(id, Behaviour::Panic);
        self
    }

    /// Sleep for `delay`, set `finished`, then answer normally.
    pub fn slow(mut self, id: &'static str, delay: Duration, finished: Arc<AtomicBool>) -> Self {
        self.overrides.insert(id, Behaviour::Slow(delay, finished));
        self
    }
}

#[async_trait]
impl AgentExecutor for ScriptedAgents {
    async fn execute(&self, agent_id: &str, context: &Context) -> Result<AgentOutput, AgentError> {
        match self.overrides.get(agent_id) {
            None => self.local.execute(agent_id, context).await,
            Some(Behaviour::Fail) => Err(AgentError::ExecutionFailed {
                agent_id: agent_id.to_string(),
                reason: "scripted failure".into(),
            }),
            Some(Behaviour::Hang) => std::future::pending().await,
            Some(Behaviour::Panic) => panic!("scripted panic in {agent_id}"),
            Some(Behaviour::Slow(delay, finished)) => {
                tokio::time::sleep(*delay).await;
                finished.store(true, Ordering::SeqCst);
                self.local.execute(agent_id, context).await
            }
        }
    }
}

/// A store whose every read fails.
pub struct FailingStore;

#[async_trait]
impl ContextStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn load(&self, _user_id: &str) -> Result<UserSnapshot, StoreError> {
        Err(StoreError::Storage("disk on fire".into()))
    }
}

/// A store that panics on read.
pub struct PanickingStore;

#[async_trait]
impl ContextStore for PanickingStore {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn load(&self, user_id: &str) -> Result<UserSnapshot, StoreError> {
        panic!("scripted store panic for {user_id}")
    }
}

/// A store that answers with an empty snapshot after a delay.
pub struct SlowStore {
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ContextStore for SlowStore {
    fn name(&self) -> &str {
        "slow"
    }

    async fn load(&self, _user_id: &str) -> Result<UserSnapshot, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(UserSnapshot::default())
    }
}

/// An experiment source that panics on every lookup.
pub struct PanickingSource;

impl ExperimentSource for PanickingSource {
    fn select(
        &self,
        user_id: &str,
        _experiment_ids: Option<&[String]>,
        _base: EffectiveConfig,
    ) -> ExperimentSelection {
        panic!("scripted experiment panic for {user_id}")
    }
}

/// A diagnostics sink that panics on every trace.
pub struct PanickingSink;

impl DiagnosticsSink for PanickingSink {
    fn record(&self, trace: &OrchestrationTrace) {
        panic!("scripted sink panic for {}", trace.user_id)
    }
}

/// A classifier that blocks its thread for `delay`, then flags everything
/// as high risk.
pub struct SlowHighRisk {
    delay: Duration,
}

impl SlowHighRisk {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl RiskClassifier for SlowHighRisk {
    fn name(&self) -> &str {
        "slow_high_risk"
    }

    fn classify(&self, _text: &str) -> RiskAssessment {
        std::thread::sleep(self.delay);
        RiskAssessment {
            level: RiskLevel::High,
            matched: vec!["scripted".into()],
        }
    }
}
