//! The four-stage tip pipeline.
//!
//! ```text
//! load context ──▶ algorithms ──▶ agents ──▶ guardian ──▶ generate tip
//!   0.3T ≤1.5s     (every level)   0.4T ≤2s    0.2T ≤1s     remaining T
//! ```
//!
//! Every stage runs in its own spawned task under a time slice of the total
//! budget `T`. A slice that runs out degrades the call instead of failing
//! it, and the task that overran is left to finish in the background.
//!
//! The fallback level only ever rises:
//!
//! | level | tip comes from                           |
//! |-------|------------------------------------------|
//! | 0     | text generator, every stage completed    |
//! | 1     | text generator, load or agents timed out |
//! | 2     | detector output                          |
//! | 3     | the strategy's static tip                |
//!
//! [`Orchestrator::run`] never fails. Errors and panics inside the pipeline
//! are caught at the root and turned into a level-3 tip.

use std::fmt::Write as _;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use stride_config::{AppConfig, ConfigError, DetectorsConfig};
use stride_core::{
    AgentError, AgentExecutor, AgentOutput, Context, ContextStore, DiagnosticsSink, Error,
    FallbackLevel, GenerationRequest, NullSink, OrchestrationTrace, PipelineFault, TextGenerator,
    Tip,
};
use stride_experiments::{
    EffectiveConfig, ExperimentCatalog, ExperimentSelection, ExperimentSource, SamplingInput,
    SamplingPolicy,
};
use stride_guardian::{Guardian, GuardianInput, ValidationResult};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::algorithms::{AlgorithmInsights, algorithm_tip, analyse};
use crate::request::{Insights, OrchestrationRequest, OrchestrationResult, ProcessingInfo};
use crate::strategy::{Strategy, StrategyRegistry};
use crate::tip_parse::parse_tip;

/// Pipeline knobs that do not vary per experiment.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Defaults that experiment fragments and request options overlay.
    pub base: EffectiveConfig,
    pub enable_full_orchestration: bool,
    pub load_context_cap: Duration,
    pub agents_cap: Duration,
    pub guardian_cap: Duration,
    /// Experiments evaluated when a request names none. Empty means all.
    pub default_experiments: Vec<String>,
    pub detectors: DetectorsConfig,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let pipeline = &config.pipeline;
        Self {
            base: config.effective_base(),
            enable_full_orchestration: pipeline.enable_full_orchestration,
            load_context_cap: Duration::from_millis(pipeline.load_context_cap_ms),
            agents_cap: Duration::from_millis(pipeline.agents_cap_ms),
            guardian_cap: Duration::from_millis(pipeline.guardian_cap_ms),
            default_experiments: pipeline.default_experiments.clone(),
            detectors: config.detectors.clone(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Runs tip requests through the staged pipeline.
///
/// Cheap to clone; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<StrategyRegistry>,
    store: Arc<dyn ContextStore>,
    agents: Arc<dyn AgentExecutor>,
    generator: Option<Arc<dyn TextGenerator>>,
    guardian: Guardian,
    experiments: Arc<dyn ExperimentSource>,
    sampling: SamplingPolicy,
    sink: Arc<dyn DiagnosticsSink>,
    settings: Arc<OrchestratorSettings>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store.name())
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_string()))
            .field("guardian", &self.guardian)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Builder for [`Orchestrator`]. Only the store and agents are required.
pub struct OrchestratorBuilder {
    registry: Arc<StrategyRegistry>,
    store: Arc<dyn ContextStore>,
    agents: Arc<dyn AgentExecutor>,
    generator: Option<Arc<dyn TextGenerator>>,
    guardian: Guardian,
    experiments: Arc<dyn ExperimentSource>,
    sampling: SamplingPolicy,
    sink: Arc<dyn DiagnosticsSink>,
    settings: OrchestratorSettings,
}

impl OrchestratorBuilder {
    pub fn registry(mut self, registry: Arc<StrategyRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn guardian(mut self, guardian: Guardian) -> Self {
        self.guardian = guardian;
        self
    }

    pub fn experiments(mut self, experiments: Arc<dyn ExperimentSource>) -> Self {
        self.experiments = experiments;
        self
    }

    pub fn sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Take settings, experiments, sampling and the guardian's ceiling from
    /// a loaded config.
    pub fn with_config(self, config: &AppConfig) -> Result<Self, ConfigError> {
        let catalog = config.catalog()?;
        let guardian = self
            .guardian
            .clone()
            .with_valuation_ceiling(config.guardian.valuation_ceiling);
        Ok(self
            .settings(OrchestratorSettings::from_config(config))
            .experiments(Arc::new(catalog))
            .sampling(config.sampling.clone())
            .guardian(guardian))
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            registry: self.registry,
            store: self.store,
            agents: self.agents,
            generator: self.generator,
            guardian: self.guardian,
            experiments: self.experiments,
            sampling: self.sampling,
            sink: self.sink,
            settings: Arc::new(self.settings),
        }
    }
}

/// Mutable bookkeeping for one call.
struct CallState {
    level: FallbackLevel,
    faults: Vec<PipelineFault>,
}

impl CallState {
    fn new(level: FallbackLevel) -> Self {
        Self {
            level,
            faults: Vec::new(),
        }
    }

    fn timed_out(&mut self, stage: &str, budget: Duration, raise_to: FallbackLevel) {
        warn!(stage, budget_ms = budget.as_millis() as u64, "Stage timed out");
        self.faults.push(PipelineFault::StageTimeout {
            stage: stage.to_string(),
            budget_ms: budget.as_millis() as u64,
        });
        self.level.raise(raise_to);
    }

    fn collaborator_failed(&mut self, collaborator: &str, reason: String, raise_to: FallbackLevel) {
        warn!(collaborator, reason = %reason, "Collaborator failed");
        self.faults.push(PipelineFault::CollaboratorFailure {
            collaborator: collaborator.to_string(),
            reason,
        });
        self.level.raise(raise_to);
    }
}

/// A finished call, before sampling.
struct Outcome {
    tip: Tip,
    insights: Insights,
    agents_used: Vec<String>,
    level: FallbackLevel,
    faults: Vec<PipelineFault>,
    error: Option<String>,
    account_created_at: Option<DateTime<Utc>>,
    has_feedback: bool,
}

impl Orchestrator {
    pub fn builder(store: Arc<dyn ContextStore>, agents: Arc<dyn AgentExecutor>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            registry: Arc::new(StrategyRegistry::new()),
            store,
            agents,
            generator: None,
            guardian: Guardian::default(),
            experiments: Arc::new(ExperimentCatalog::default()),
            sampling: SamplingPolicy::default(),
            sink: Arc::new(NullSink),
            settings: OrchestratorSettings::default(),
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Produce a tip for `request`. Never fails.
    pub async fn run(&self, request: OrchestrationRequest) -> OrchestrationResult {
        let started = Instant::now();
        info!(domain = %request.domain, user_id = %request.user_id, "Tip requested");

        let pipeline = self.clone();
        let body_request = request.clone();
        let joined = tokio::spawn(async move { pipeline.execute(body_request, started).await }).await;

        let outcome = match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => self.root_fallback(&request, e.to_string()),
            Err(join) => self.root_fallback(&request, describe_join_error(&join)),
        };
        self.finish(&request, outcome, started)
    }

    fn select_experiments(&self, request: &OrchestrationRequest) -> ExperimentSelection {
        let ids = request.options.experiment_ids.as_deref().or_else(|| {
            let defaults = &self.settings.default_experiments;
            (!defaults.is_empty()).then_some(defaults.as_slice())
        });
        let mut selection = self
            .experiments
            .select(&request.user_id, ids, self.settings.base.clone());
        if let Some(ms) = request.options.timeout_ms {
            selection.merged.total_timeout_ms = ms;
        }
        debug!(
            user_id = %request.user_id,
            assignments = selection.assignments.len(),
            timeout_ms = selection.merged.total_timeout_ms,
            "Experiments selected"
        );
        selection
    }

    /// The pipeline body. An `Err` here is absorbed by [`Orchestrator::run`].
    async fn execute(self, request: OrchestrationRequest, started: Instant) -> Result<Outcome, Error> {
        let selection = self.select_experiments(&request);
        let domain = request.domain;
        let strategy = self.registry.get(domain);
        let effective = &selection.merged;
        let total = Duration::from_millis(effective.total_timeout_ms);

        let full = request
            .options
            .enable_full_orchestration
            .unwrap_or(self.settings.enable_full_orchestration);
        let mut state = CallState::new(if full {
            FallbackLevel::FULL
        } else {
            FallbackLevel::ALGORITHMS
        });

        // Stage 1: context
        let load_budget = slice(total, 0.3, self.settings.load_context_cap);
        let loader = {
            let registry = self.registry.clone();
            let store = self.store.clone();
            let user_id = request.user_id.clone();
            async move { registry.get(domain).load_context(store.as_ref(), &user_id).await }
        };
        let mut context = match detached(load_budget, loader).await {
            Some(Ok(loaded)) => loaded?,
            Some(Err(join)) => return Err(Error::Internal(describe_join_error(&join))),
            None => {
                state.timed_out("load_context", load_budget, FallbackLevel::PARTIAL);
                Context::empty(&request.user_id, domain)
            }
        };
        if let Some(overlay) = &request.context_override {
            context = context.with_override(overlay)?;
        }

        let algorithms = analyse(&context, &self.settings.detectors);
        let context = Arc::new(context);

        // Stage 2: agents
        let mut outputs = Vec::new();
        if state.level < FallbackLevel::ALGORITHMS {
            outputs = self
                .run_agents(strategy, &context, effective, total, &mut state)
                .await?;
        }
        let agents_used: Vec<String> = outputs.iter().map(|o| o.agent_id.clone()).collect();

        // Stage 3: guardian
        let mut validation = None;
        if state.level < FallbackLevel::ALGORITHMS && !outputs.is_empty() {
            validation = self
                .run_guardian(strategy, &context, &outputs, effective, total, &mut state)
                .await?;
        }

        // Stage 4: tip
        let tip = if state.level < FallbackLevel::ALGORITHMS {
            self.generate_tip(strategy, &context, &outputs, &algorithms, effective, total, started, &mut state)
                .await?
        } else if state.level == FallbackLevel::ALGORITHMS {
            algorithm_tip(&algorithms, strategy)
        } else {
            strategy.fallback_message()
        };

        let mut insights = Insights::from_algorithms(algorithms);
        insights.agent_outputs = outputs;
        insights.validation = validation;
        insights.experiments = selection.assignments.clone();

        Ok(Outcome {
            tip,
            insights,
            agents_used,
            level: state.level,
            faults: state.faults,
            error: None,
            account_created_at: context.data.account_created_at,
            has_feedback: context.data.feedback.is_some(),
        })
    }

    async fn run_agents(
        &self,
        strategy: &dyn Strategy,
        context: &Arc<Context>,
        effective: &EffectiveConfig,
        total: Duration,
        state: &mut CallState,
    ) -> Result<Vec<AgentOutput>, Error> {
        let mut ids = vec![strategy.primary_agent_id()];
        if !effective.skip_secondary_agents {
            ids.extend_from_slice(strategy.secondary_agent_ids());
        }

        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let agents = self.agents.clone();
                let context = context.clone();
                tokio::spawn(async move { agents.execute(id, &context).await })
            })
            .collect();

        let budget = slice(total, 0.4, self.settings.agents_cap);
        let Ok(joined) = tokio::time::timeout(budget, join_all(handles)).await else {
            state.timed_out("agents", budget, FallbackLevel::PARTIAL);
            return Ok(Vec::new());
        };

        let mut outputs = Vec::with_capacity(ids.len());
        for (id, result) in ids.into_iter().zip(joined) {
            match result {
                Ok(Ok(output)) => outputs.push(output),
                Ok(Err(e)) => state.collaborator_failed(id, e.to_string(), FallbackLevel::FULL),
                Err(join) => {
                    return Err(AgentError::Aborted {
                        agent_id: id.to_string(),
                        reason: describe_join_error(&join),
                    }
                    .into());
                }
            }
        }
        debug!(agents = outputs.len(), "Agent stage complete");
        Ok(outputs)
    }

    async fn run_guardian(
        &self,
        strategy: &dyn Strategy,
        context: &Context,
        outputs: &[AgentOutput],
        effective: &EffectiveConfig,
        total: Duration,
        state: &mut CallState,
    ) -> Result<Option<ValidationResult>, Error> {
        let primary = strategy.primary_agent_id();
        let Some(candidate) = outputs
            .iter()
            .find(|o| o.agent_id == primary)
            .or_else(|| outputs.iter().max_by(|a, b| a.confidence.total_cmp(&b.confidence)))
        else {
            return Ok(None);
        };

        let guardian = self.guardian.clone();
        let rules = strategy.validation_rules();
        let input = GuardianInput::from_context(context, Utc::now().date_naive());
        let text = candidate.recommendation.clone();
        let min_confidence = effective.guardian_min_confidence;

        let budget = slice(total, 0.2, self.settings.guardian_cap);
        let check = async move { guardian.validate(&text, rules, &input, min_confidence) };
        match detached(budget, check).await {
            Some(Ok(result)) => {
                if !result.passed {
                    info!(
                        agent = %candidate.agent_id,
                        issues = ?result.issues,
                        confidence = result.confidence,
                        "Guardian blocked recommendation"
                    );
                    state.faults.push(PipelineFault::ValidationBlocked {
                        issues: result.issues.clone(),
                    });
                    state.level.raise(FallbackLevel::STATIC);
                }
                Ok(Some(result))
            }
            Some(Err(join)) => Err(Error::Internal(describe_join_error(&join))),
            None => {
                // Nothing unvalidated reaches the generator.
                state.timed_out("guardian", budget, FallbackLevel::ALGORITHMS);
                Ok(None)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn generate_tip(
        &self,
        strategy: &dyn Strategy,
        context: &Context,
        outputs: &[AgentOutput],
        algorithms: &AlgorithmInsights,
        effective: &EffectiveConfig,
        total: Duration,
        started: Instant,
        state: &mut CallState,
    ) -> Result<Tip, Error> {
        let remaining = total.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            state.timed_out("generate", remaining, FallbackLevel::STATIC);
            return Ok(strategy.fallback_message());
        }

        let Some(generator) = self.generator.clone() else {
            state.collaborator_failed(
                "text_generator",
                "no generator configured".into(),
                FallbackLevel::ALGORITHMS,
            );
            return Ok(algorithm_tip(algorithms, strategy));
        };

        let request = GenerationRequest::new(
            strategy.system_prompt(),
            build_user_prompt(strategy, context, outputs, algorithms),
            effective.generation_temperature,
        );
        let name = generator.name().to_string();
        let call = async move { generator.generate(request).await };

        match detached(remaining, call).await {
            Some(Ok(Ok(raw))) => match parse_tip(&raw) {
                Ok(tip) => Ok(tip),
                Err(reason) => {
                    warn!(generator = %name, reason = %reason, "Generated tip did not parse");
                    state.faults.push(PipelineFault::GenerationParseFailure { reason });
                    state.level.raise(FallbackLevel::STATIC);
                    Ok(strategy.fallback_message())
                }
            },
            Some(Ok(Err(e))) => {
                state.collaborator_failed(&name, e.to_string(), FallbackLevel::STATIC);
                Ok(strategy.fallback_message())
            }
            Some(Err(join)) => Err(Error::Internal(describe_join_error(&join))),
            None => {
                state.timed_out("generate", remaining, FallbackLevel::STATIC);
                Ok(strategy.fallback_message())
            }
        }
    }

    fn root_fallback(&self, request: &OrchestrationRequest, error: String) -> Outcome {
        warn!(
            domain = %request.domain,
            user_id = %request.user_id,
            error = %error,
            "Pipeline failed, serving static tip"
        );
        Outcome {
            tip: self.registry.get(request.domain).fallback_message(),
            insights: Insights::default(),
            agents_used: Vec::new(),
            level: FallbackLevel::STATIC,
            faults: Vec::new(),
            error: Some(error),
            account_created_at: None,
            has_feedback: false,
        }
    }

    fn finish(&self, request: &OrchestrationRequest, outcome: Outcome, started: Instant) -> OrchestrationResult {
        let duration_ms = started.elapsed().as_millis() as u64;
        let input = SamplingInput {
            had_error: outcome.error.is_some(),
            fallback_level: outcome.level,
            account_created_at: outcome.account_created_at,
            has_feedback: outcome.has_feedback,
            ..SamplingInput::new(outcome.level)
        };
        let sample_reason = self.sampling.sample(&input);

        if let Some(reason) = sample_reason {
            let mut trace = OrchestrationTrace::new(&request.user_id, request.domain, reason);
            trace.fallback_level = outcome.level;
            trace.orchestration_type = outcome.level.orchestration_type();
            trace.duration_ms = duration_ms;
            trace.agents_used = outcome.agents_used.clone();
            trace.faults = outcome.faults;
            trace.error = outcome.error;
            trace.experiments = outcome.insights.experiments.clone();
            let sink = &self.sink;
            if panic::catch_unwind(AssertUnwindSafe(|| sink.record(&trace))).is_err() {
                warn!(user_id = %request.user_id, "Diagnostics sink panicked, trace dropped");
            }
        }

        info!(
            domain = %request.domain,
            user_id = %request.user_id,
            fallback_level = outcome.level.value(),
            duration_ms,
            sampled = sample_reason.is_some(),
            "Tip served"
        );

        OrchestrationResult {
            tip: outcome.tip,
            insights: outcome.insights,
            processing_info: ProcessingInfo {
                agents_used: outcome.agents_used,
                fallback_level: outcome.level,
                duration_ms,
                orchestration_type: outcome.level.orchestration_type(),
                sampled: sample_reason.is_some(),
            },
        }
    }
}

/// `fraction` of `total`, capped.
fn slice(total: Duration, fraction: f64, cap: Duration) -> Duration {
    total.mul_f64(fraction).min(cap)
}

/// Spawn `fut` and wait up to `budget` for it.
///
/// `None` means the budget ran out. The task is detached, not cancelled,
/// and runs to completion on its own.
async fn detached<F>(budget: Duration, fut: F) -> Option<Result<F::Output, JoinError>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::time::timeout(budget, tokio::spawn(fut)).await.ok()
}

fn describe_join_error(err: &JoinError) -> String {
    if err.is_panic() {
        "task panicked".to_string()
    } else {
        "task cancelled".to_string()
    }
}

/// The user prompt: the strategy's context rendering plus what the agents
/// and detectors found.
fn build_user_prompt(
    strategy: &dyn Strategy,
    context: &Context,
    outputs: &[AgentOutput],
    algorithms: &AlgorithmInsights,
) -> String {
    let mut prompt = strategy.format_context_for_prompt(context);

    if let Some(streak) = algorithms.active_streak() {
        let _ = writeln!(
            prompt,
            "Low-energy streak: {} weeks ({:?})",
            streak.consecutive_low_weeks, streak.severity
        );
    }
    if let Some(window) = &algorithms.comeback {
        let _ = writeln!(
            prompt,
            "Comeback after {} low weeks; catch-up over {} weeks",
            window.deficit_weeks, window.suggested_catch_up_weeks
        );
    }
    for output in outputs {
        let _ = writeln!(
            prompt,
            "{} (confidence {:.2}): {}",
            output.agent_id, output.confidence, output.recommendation
        );
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_agents::LocalAgents;
    use crate::test_helpers::{
        FailingStore, HangingGenerator, PanickingSink, PanickingSource, PanickingStore,
        ScriptedAgents, ScriptedGenerator, SlowHighRisk, SlowStore, VALID_TIP,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use stride_core::{DomainId, EnergyEntry, OrchestrationType, UserSnapshot};
    use stride_experiments::{ConfigFragment, Experiment, Variant};
    use stride_store::InMemoryContextStore;
    use stride_telemetry::TraceRecorder;

    fn snapshot() -> UserSnapshot {
        UserSnapshot {
            energy_history: vec![
                EnergyEntry::new(1, 70.0),
                EnergyEntry::new(2, 65.0),
                EnergyEntry::new(3, 72.0),
            ],
            monthly_income: 1200.0,
            monthly_expenses: 900.0,
            available_hours_per_week: Some(12.0),
            skills: vec!["tutoring".into()],
            ..Default::default()
        }
    }

    async fn store_with(user: &str, data: UserSnapshot) -> Arc<InMemoryContextStore> {
        let store = InMemoryContextStore::new();
        store.put(user, data).await;
        Arc::new(store)
    }

    fn quiet_sampling() -> SamplingPolicy {
        SamplingPolicy {
            base_rate: 0.0,
            ..Default::default()
        }
    }

    fn single_variant(id: &str, fragment: ConfigFragment) -> Arc<ExperimentCatalog> {
        Arc::new(
            ExperimentCatalog::new(vec![Experiment {
                id: id.into(),
                enabled: true,
                variants: vec![Variant {
                    name: "only".into(),
                    weight: 1,
                    fragment,
                }],
            }])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn full_pipeline_uses_generated_tip() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(generator.clone())
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::FULL);
        assert_eq!(result.processing_info.orchestration_type, OrchestrationType::Full);
        assert_eq!(result.tip.title, "Pack lunch");
        assert_eq!(
            result.processing_info.agents_used,
            vec!["budget-coach", "goal-planner", "energy-calibrator"]
        );
        assert!(result.insights.validation.as_ref().unwrap().passed);
        assert_eq!(generator.calls(), 1);

        let prompt = &generator.requests()[0].user_prompt;
        assert!(prompt.contains("margin: 300"));
        assert!(prompt.contains("budget-coach (confidence"));
    }

    #[tokio::test]
    async fn disabled_full_orchestration_skips_agents_and_generator() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(generator.clone())
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Goals, "u1").with_full_orchestration(false))
            .await;

        assert!(result.processing_info.fallback_level >= FallbackLevel::ALGORITHMS);
        assert!(result.processing_info.agents_used.is_empty());
        assert!(result.insights.agent_outputs.is_empty());
        assert!(result.insights.energy_trend.is_some());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn missing_generator_serves_algorithm_tip() {
        let data = UserSnapshot {
            energy_history: [30.0, 35.0, 85.0]
                .iter()
                .enumerate()
                .map(|(i, &l)| EnergyEntry::new(i as u32 + 1, l))
                .collect(),
            savings_deficit: Some(240.0),
            upcoming_capacity: vec![90.0, 80.0, 70.0],
            monthly_income: 1000.0,
            monthly_expenses: 700.0,
            ..Default::default()
        };
        let orchestrator =
            Orchestrator::builder(store_with("u1", data).await, Arc::new(LocalAgents::default())).build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Goals, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::ALGORITHMS);
        assert_eq!(result.tip.title, "Catch up at your own pace");
        assert_eq!(result.insights.catch_up_plan.len(), 3);
        assert!(result.insights.comeback.is_some());
    }

    #[tokio::test]
    async fn unparsable_generation_falls_back_to_static_tip() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok("Here you go: save more!".into())]));
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(generator)
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Jobs, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::STATIC);
        assert_eq!(result.tip, orchestrator.registry().get(DomainId::Jobs).fallback_message());
    }

    #[tokio::test]
    async fn generator_error_falls_back_to_static_tip() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(
            stride_core::GenerationError::Network("down".into()),
        )]));
        let recorder = Arc::new(TraceRecorder::new());
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(generator)
        .sink(recorder.clone())
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Trade, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::STATIC);
        assert!(result.processing_info.sampled);
        let trace = &recorder.recent(1)[0];
        assert!(trace.faults.iter().any(|f| matches!(
            f,
            PipelineFault::CollaboratorFailure { collaborator, .. } if collaborator == "scripted"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_agent_degrades_to_partial() {
        let agents = ScriptedAgents::new().hang("energy-calibrator");
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let recorder = Arc::new(TraceRecorder::new());
        let orchestrator = Orchestrator::builder(store_with("u1", snapshot()).await, Arc::new(agents))
            .generator(generator)
            .sink(recorder.clone())
            .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::PARTIAL);
        assert_eq!(result.processing_info.orchestration_type, OrchestrationType::Partial);
        assert!(result.insights.agent_outputs.is_empty());
        assert!(result.insights.validation.is_none());
        assert_eq!(result.tip.title, "Pack lunch");

        let trace = &recorder.recent(1)[0];
        assert_eq!(
            trace.faults[0],
            PipelineFault::StageTimeout {
                stage: "agents".into(),
                budget_ms: 2000
            }
        );
    }

    #[tokio::test]
    async fn failing_secondary_agent_is_dropped() {
        let agents = ScriptedAgents::new().fail("goal-planner");
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let orchestrator = Orchestrator::builder(store_with("u1", snapshot()).await, Arc::new(agents))
            .generator(generator)
            .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::FULL);
        assert_eq!(
            result.processing_info.agents_used,
            vec!["budget-coach", "energy-calibrator"]
        );
    }

    #[tokio::test]
    async fn panicking_agent_is_caught_at_the_root() {
        let agents = ScriptedAgents::new().panic("budget-coach");
        let recorder = Arc::new(TraceRecorder::new());
        let orchestrator = Orchestrator::builder(store_with("u1", snapshot()).await, Arc::new(agents))
            .generator(Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())])))
            .sink(recorder.clone())
            .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::STATIC);
        assert!(result.tip.is_well_formed());
        assert!(result.processing_info.sampled);
        let trace = &recorder.recent(1)[0];
        assert!(trace.error.as_deref().unwrap().contains("budget-coach"));
    }

    #[tokio::test]
    async fn store_errors_are_caught_at_the_root() {
        let recorder = Arc::new(TraceRecorder::new());
        let orchestrator =
            Orchestrator::builder(Arc::new(FailingStore), Arc::new(LocalAgents::default()))
                .sink(recorder.clone())
                .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Profile, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::STATIC);
        assert_eq!(result.tip.category, "profile");
        assert!(recorder.recent(1)[0].had_error());
    }

    #[tokio::test]
    async fn store_panics_are_caught_at_the_root() {
        let orchestrator =
            Orchestrator::builder(Arc::new(PanickingStore), Arc::new(LocalAgents::default())).build();
        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Discovery, "u1"))
            .await;
        assert_eq!(result.processing_info.fallback_level, FallbackLevel::STATIC);
    }

    #[tokio::test]
    async fn invalid_override_is_caught_at_the_root() {
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .build();
        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1").with_override(json!([1, 2])))
            .await;
        assert_eq!(result.processing_info.fallback_level, FallbackLevel::STATIC);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_yields_empty_context() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let orchestrator = Orchestrator::builder(
            Arc::new(SlowStore::new(Duration::from_secs(10))),
            Arc::new(LocalAgents::default()),
        )
        .generator(generator.clone())
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Goals, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::PARTIAL);
        assert!(result.insights.energy_debt.is_none());
        assert!(generator.requests()[0].user_prompt.contains("none recorded"));
    }

    #[tokio::test]
    async fn override_reaches_the_prompt() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(generator.clone())
        .build();

        orchestrator
            .run(
                OrchestrationRequest::new(DomainId::Budget, "u1")
                    .with_override(json!({ "monthly_expenses": 1000.0 })),
            )
            .await;

        assert!(generator.requests()[0].user_prompt.contains("margin: 200"));
    }

    #[tokio::test]
    async fn guardian_block_serves_static_tip() {
        let data = UserSnapshot {
            monthly_income: 600.0,
            monthly_expenses: 1100.0,
            ..snapshot()
        };
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let recorder = Arc::new(TraceRecorder::new());
        let orchestrator =
            Orchestrator::builder(store_with("u1", data).await, Arc::new(LocalAgents::default()))
                .generator(generator.clone())
                .sink(recorder.clone())
                .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::STATIC);
        let validation = result.insights.validation.unwrap();
        assert!(!validation.passed);
        assert!(validation.confidence < 0.7);
        assert_eq!(generator.calls(), 0);
        assert!(recorder.recent(1)[0]
            .faults
            .iter()
            .any(|f| matches!(f, PipelineFault::ValidationBlocked { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn guardian_timeout_never_generates_from_the_candidate() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(generator.clone())
        .guardian(Guardian::new(Arc::new(SlowHighRisk::new(Duration::from_millis(600)))))
        .build();

        // Guardian slice is 0.2 * 1000ms.
        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1").with_timeout_ms(1000))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::ALGORITHMS);
        assert!(result.insights.validation.is_none());
        assert_eq!(generator.calls(), 0);
        assert!(result.tip.is_well_formed());
        assert_ne!(result.tip.title, "Pack lunch");
    }

    #[tokio::test]
    async fn panicking_experiment_source_is_caught_at_the_root() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let recorder = Arc::new(TraceRecorder::new());
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(generator.clone())
        .experiments(Arc::new(PanickingSource))
        .sink(recorder.clone())
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::STATIC);
        assert!(result.tip.is_well_formed());
        assert!(result.insights.experiments.is_empty());
        assert_eq!(generator.calls(), 0);
        assert!(recorder.recent(1)[0].had_error());
    }

    #[tokio::test]
    async fn panicking_sink_does_not_fail_the_call() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(generator)
        .sampling(SamplingPolicy {
            base_rate: 1.0,
            ..Default::default()
        })
        .sink(Arc::new(PanickingSink))
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert_eq!(result.tip.title, "Pack lunch");
        assert_eq!(result.processing_info.fallback_level, FallbackLevel::FULL);
        assert!(result.processing_info.sampled);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_generator_exhausts_the_budget() {
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(Arc::new(HangingGenerator))
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1").with_timeout_ms(1000))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::STATIC);
        assert!(result.processing_info.duration_ms >= 1000);
        assert!(result.processing_info.duration_ms < 1100);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_agents_keep_running() {
        let finished = Arc::new(AtomicBool::new(false));
        let agents = ScriptedAgents::new().slow("budget-coach", Duration::from_secs(3), finished.clone());
        let orchestrator = Orchestrator::builder(store_with("u1", snapshot()).await, Arc::new(agents))
            .generator(Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())])))
            .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;
        assert_eq!(result.processing_info.fallback_level, FallbackLevel::PARTIAL);
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn experiment_fragment_skips_secondaries() {
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())])))
        .experiments(single_variant(
            "secondary-agents",
            ConfigFragment {
                skip_secondary_agents: Some(true),
                ..Default::default()
            },
        ))
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert_eq!(result.processing_info.agents_used, vec!["budget-coach"]);
        assert_eq!(result.insights.experiments[0].experiment_id, "secondary-agents");
        assert_eq!(result.insights.experiments[0].variant, "only");
    }

    #[tokio::test]
    async fn experiment_temperature_reaches_the_generator() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())]));
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(generator.clone())
        .experiments(single_variant(
            "tip-temperature",
            ConfigFragment {
                generation_temperature: Some(0.2),
                ..Default::default()
            },
        ))
        .build();

        orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert!((generator.requests()[0].temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn request_timeout_beats_experiment_timeout() {
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .experiments(single_variant(
            "timeouts",
            ConfigFragment {
                total_timeout_ms: Some(9000),
                ..Default::default()
            },
        ))
        .build();

        let request = OrchestrationRequest::new(DomainId::Budget, "u1").with_timeout_ms(1200);
        assert_eq!(orchestrator.select_experiments(&request).merged.total_timeout_ms, 1200);
        let request = OrchestrationRequest::new(DomainId::Budget, "u1");
        assert_eq!(orchestrator.select_experiments(&request).merged.total_timeout_ms, 9000);
        let request = OrchestrationRequest::new(DomainId::Budget, "u1")
            .with_experiments(vec!["unknown".into()]);
        assert_eq!(orchestrator.select_experiments(&request).merged.total_timeout_ms, 5000);
    }

    #[tokio::test]
    async fn quiet_calls_are_not_sampled() {
        let recorder = Arc::new(TraceRecorder::new());
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())])))
        .sampling(quiet_sampling())
        .sink(recorder.clone())
        .build();

        let result = orchestrator
            .run(OrchestrationRequest::new(DomainId::Budget, "u1"))
            .await;

        assert_eq!(result.processing_info.fallback_level, FallbackLevel::FULL);
        assert!(!result.processing_info.sampled);
        assert!(recorder.is_empty());
    }

    #[tokio::test]
    async fn feedback_forces_sampling() {
        let recorder = Arc::new(TraceRecorder::new());
        let orchestrator = Orchestrator::builder(
            store_with("u1", snapshot()).await,
            Arc::new(LocalAgents::default()),
        )
        .generator(Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())])))
        .sampling(quiet_sampling())
        .sink(recorder.clone())
        .build();

        let result = orchestrator
            .run(
                OrchestrationRequest::new(DomainId::Budget, "u1")
                    .with_override(json!({ "feedback": "too generic" })),
            )
            .await;

        assert!(result.processing_info.sampled);
        assert_eq!(recorder.recent(1)[0].sample_reason, stride_core::SampleReason::Feedback);
    }

    #[tokio::test]
    async fn every_domain_always_gets_a_tip() {
        let store = store_with("u1", snapshot()).await;
        for with_generator in [false, true] {
            for domain in DomainId::ALL {
                let mut builder = Orchestrator::builder(store.clone(), Arc::new(LocalAgents::default()));
                if with_generator {
                    builder = builder
                        .generator(Arc::new(ScriptedGenerator::new(vec![Ok(VALID_TIP.to_string())])));
                }
                let result = builder
                    .build()
                    .run(OrchestrationRequest::new(domain, "u1"))
                    .await;
                assert!(result.tip.is_well_formed());
                assert!(result.processing_info.fallback_level <= FallbackLevel::STATIC);
                assert_eq!(
                    result.processing_info.orchestration_type,
                    result.processing_info.fallback_level.orchestration_type()
                );
            }
        }
    }

    #[test]
    fn slices_are_capped() {
        let total = Duration::from_millis(5000);
        assert_eq!(slice(total, 0.3, Duration::from_millis(1500)), Duration::from_millis(1500));
        assert_eq!(slice(total, 0.4, Duration::from_millis(2000)), Duration::from_millis(2000));
        let short = Duration::from_millis(1000);
        assert_eq!(slice(short, 0.3, Duration::from_millis(1500)), Duration::from_millis(300));
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.pipeline.agents_cap_ms = 750;
        config.pipeline.default_experiments = vec!["tip-temperature".into()];
        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.agents_cap, Duration::from_millis(750));
        assert_eq!(settings.default_experiments, vec!["tip-temperature"]);
        assert_eq!(settings.base.total_timeout_ms, 5000);
    }
}
