//! Plan executor
//!
//! `Router` classifies a query, builds its plan and runs the steps in order
//! against the retrieval, generation and vision services. Service failures
//! never escape as errors: they become a degraded answer, and the exchange is
//! still recorded so the user's history stays in pairs.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use qr_core::{
    ConversationTurn, Error, GenerationProvider, Result, RetrievedChunk, Retriever, VisionProvider,
};

use crate::calculator;
use crate::classifier::{Intent, IntentClassifier};
use crate::config::{RouterConfig, ServiceIds};
use crate::history::{ConversationState, ConversationStore};
use crate::planner::{ExecutionPlan, GenerationContext, PlanBuilder, Service, Step};
use crate::prompt;

/// Answer when SUMMARIZATION finds no history
pub const NOTHING_TO_SUMMARIZE: &str = "No conversation history to summarize yet.";

/// Answer when a plan finished without producing any text
pub const EMPTY_ANSWER: &str = "I couldn't generate a response. Please try again.";

/// USER turn text recorded for image input
pub const IMAGE_TURN_TEXT: &str = "[image]";

/// The services a router dispatches to
#[derive(Clone)]
pub struct Services {
    pub retriever: Arc<dyn Retriever>,
    pub generator: Arc<dyn GenerationProvider>,
    pub vision: Arc<dyn VisionProvider>,
}

/// Validated request payload: exactly one of text or image
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    Text(String),
    Image(Vec<u8>),
}

impl QueryInput {
    pub fn from_parts(text: Option<&str>, image: Option<&[u8]>) -> Result<Self> {
        match (text, image) {
            (Some(text), None) => Ok(QueryInput::Text(text.to_string())),
            (None, Some(image)) => Ok(QueryInput::Image(image.to_vec())),
            (Some(_), Some(_)) => Err(Error::InvalidInput(
                "provide either text or an image, not both".to_string(),
            )),
            (None, None) => Err(Error::InvalidInput("provide text or an image".to_string())),
        }
    }

    fn text(&self) -> &str {
        match self {
            QueryInput::Text(text) => text,
            QueryInput::Image(_) => "",
        }
    }

    fn image(&self) -> Option<&[u8]> {
        match self {
            QueryInput::Image(bytes) => Some(bytes),
            QueryInput::Text(_) => None,
        }
    }
}

/// Why a request did not get a normal answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    RetrievalFailure,
    GenerationFailure,
    VisionFailure,
    CalculationError,
}

impl FailureKind {
    /// Retrieval, generation and vision failures replace the answer with a
    /// degraded message; a calculation error explains itself.
    pub fn is_service_failure(&self) -> bool {
        !matches!(self, FailureKind::CalculationError)
    }

    pub fn degraded_message(&self) -> &'static str {
        match self {
            FailureKind::VisionFailure => {
                "Sorry, I could not analyze that image. Please send a JPG or PNG photo and try again."
            }
            _ => "Sorry, I could not complete the request right now. Please try again.",
        }
    }

    fn for_service(service: Service) -> Self {
        match service {
            Service::Retrieval => FailureKind::RetrievalFailure,
            Service::Vision => FailureKind::VisionFailure,
            _ => FailureKind::GenerationFailure,
        }
    }
}

/// Outcome of one `process_query` call
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub request_id: Uuid,
    pub answer_text: String,
    /// Source ids of the retrieved chunks, best-first, without duplicates
    pub sources: Vec<String>,
    pub intent: Intent,
    pub elapsed: Duration,
    /// Retrieval, generation and vision calls attempted
    pub model_calls_made: u32,
    pub failure: Option<FailureKind>,
    /// No classifier rule matched and the default intent was used
    pub fallback_classification: bool,
    /// A SEARCH_CORPUS step ran and found nothing
    pub retrieval_empty: bool,
    /// Caption tags for image input
    pub tags: Vec<String>,
}

impl ExecutionResult {
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some_and(|f| f.is_service_failure())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterStats {
    pub active_conversations: usize,
    /// `None` when the retriever could not report a count
    pub indexed_chunks: Option<usize>,
    pub retrieval_k: usize,
    pub history_capacity: usize,
    pub services: ServiceIds,
}

#[derive(Default)]
struct StepOutputs {
    answer: Option<String>,
    chunks: Vec<RetrievedChunk>,
    tags: Vec<String>,
    model_calls: u32,
    retrieval_empty: bool,
}

/// Query router and plan executor
pub struct Router {
    classifier: IntentClassifier,
    planner: PlanBuilder,
    history: ConversationStore,
    services: Services,
    config: RouterConfig,
}

impl Router {
    pub fn new(services: Services, config: RouterConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            classifier: IntentClassifier::new(),
            planner: PlanBuilder::new(config.retrieval_k),
            history: ConversationStore::new(config.history_capacity),
            services,
            config,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Answer a text query or an image for `user_id`. Exactly one of `text`
    /// and `image` must be given, otherwise `Error::InvalidInput` is returned
    /// and nothing is recorded.
    pub async fn process_query(
        &self,
        text: Option<&str>,
        image: Option<&[u8]>,
        user_id: &str,
    ) -> Result<ExecutionResult> {
        let input = QueryInput::from_parts(text, image)?;
        Ok(self.process(input, user_id).await)
    }

    /// Run a validated request
    pub async fn process(&self, input: QueryInput, user_id: &str) -> ExecutionResult {
        let started = Instant::now();
        let request_id = Uuid::new_v4();

        let (plan, fallback_classification, user_turn) = match &input {
            QueryInput::Text(text) => {
                let classification = self.classifier.classify_detailed(text);
                let plan = self.planner.build_plan(classification.intent, text);
                (plan, classification.is_fallback(), ConversationTurn::user(text.as_str()))
            }
            QueryInput::Image(_) => (
                self.planner.build_image_plan(),
                false,
                ConversationTurn::user(IMAGE_TURN_TEXT),
            ),
        };

        debug!(
            request_id = %request_id,
            user = %user_id,
            intent = %plan.intent(),
            fallback = fallback_classification,
            steps = ?plan.actions(),
            "plan built"
        );

        // held until the exchange is recorded, so one user's turns stay in arrival order
        let session = self.history.session(user_id);
        let mut state = session.lock().await;

        let mut outputs = StepOutputs::default();
        let mut failure = None;

        for (index, step) in plan.steps().iter().enumerate() {
            debug!(
                request_id = %request_id,
                step = index,
                action = step.action().as_str(),
                service = step.target_service().as_str(),
                "dispatching step"
            );

            if let Err(kind) = self.run_step(step, &input, &state, &mut outputs).await {
                failure = Some(kind);
                break;
            }
        }

        let degraded = failure.is_some_and(|f: FailureKind| f.is_service_failure());
        let answer_text = match failure {
            Some(kind) if degraded => kind.degraded_message().to_string(),
            _ => outputs
                .answer
                .filter(|answer| !answer.trim().is_empty())
                .unwrap_or_else(|| EMPTY_ANSWER.to_string()),
        };

        let sources = if degraded {
            Vec::new()
        } else {
            unique_sources(&outputs.chunks)
        };

        state.push_exchange(user_turn, ConversationTurn::assistant(answer_text.as_str()));
        drop(state);

        let elapsed = started.elapsed();
        info!(
            request_id = %request_id,
            user = %user_id,
            intent = %plan.intent(),
            elapsed_ms = elapsed.as_millis() as u64,
            model_calls = outputs.model_calls,
            failure = ?failure,
            "request complete"
        );

        ExecutionResult {
            request_id,
            answer_text,
            sources,
            intent: plan.intent(),
            elapsed,
            model_calls_made: outputs.model_calls,
            failure,
            fallback_classification,
            retrieval_empty: outputs.retrieval_empty,
            tags: if degraded { Vec::new() } else { outputs.tags },
        }
    }

    async fn run_step(
        &self,
        step: &Step,
        input: &QueryInput,
        state: &ConversationState,
        outputs: &mut StepOutputs,
    ) -> std::result::Result<(), FailureKind> {
        let service = step.target_service();

        match step {
            Step::Template { reply } => {
                outputs.answer = Some(reply.reply().to_string());
            }

            Step::EvaluateExpression { expression } => match calculator::evaluate(expression) {
                Ok(value) => outputs.answer = Some(calculator::format_number(value)),
                Err(e) => {
                    debug!(expression = %expression, error = %e, "calculation rejected");
                    outputs.answer = Some(format!("Calculation error: {}", e));
                    return Err(FailureKind::CalculationError);
                }
            },

            Step::SearchCorpus { query, k } => {
                outputs.model_calls += 1;
                let chunks = self
                    .bounded(service, self.services.retriever.search(query, *k))
                    .await
                    .map_err(|e| service_failure(step, e))?;

                outputs.retrieval_empty = chunks.is_empty();
                outputs.chunks = chunks;
            }

            Step::Generate { context } => {
                let recent = self.config.history_context_turns;
                let (prompt, turns) = match context {
                    GenerationContext::Retrieved => (
                        prompt::knowledge_prompt(input.text(), &outputs.chunks),
                        state.recent(recent),
                    ),
                    GenerationContext::History => {
                        if state.is_empty() {
                            outputs.answer = Some(NOTHING_TO_SUMMARIZE.to_string());
                            return Ok(());
                        }
                        (prompt::summary_prompt(&state.turns()), Vec::new())
                    }
                    GenerationContext::RecentTurns => {
                        (prompt::chat_prompt(input.text()), state.recent(recent))
                    }
                };

                outputs.model_calls += 1;
                let result = self
                    .bounded(service, self.services.generator.generate(&prompt, &turns))
                    .await
                    .map_err(|e| service_failure(step, e))?;

                outputs.answer = Some(result.text.trim().to_string());
            }

            Step::Caption => {
                let Some(image) = input.image() else {
                    warn!("caption step without image input");
                    return Err(FailureKind::VisionFailure);
                };

                outputs.model_calls += 1;
                let caption = self
                    .bounded(service, self.services.vision.caption(image))
                    .await
                    .map_err(|e| service_failure(step, e))?;

                outputs.answer = Some(caption.text);
                outputs.tags = caption.tags;
            }
        }

        Ok(())
    }

    /// Apply the configured per-call timeout
    async fn bounded<T, F>(&self, service: Service, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                Error::Timeout(format!("{} call exceeded {:?}", service.as_str(), limit))
            })?,
            None => call.await,
        }
    }

    /// Classify and plan a text query without running it
    pub fn explain(&self, text: &str) -> ExecutionPlan {
        let intent = self.classifier.classify(text);
        self.planner.build_plan(intent, text)
    }

    /// The plan every image request runs
    pub fn explain_image(&self) -> ExecutionPlan {
        self.planner.build_image_plan()
    }

    /// Forget a user's conversation; a no-op for unknown users
    pub async fn clear_history(&self, user_id: &str) {
        self.history.clear(user_id).await;
        debug!(user = %user_id, "history cleared");
    }

    pub async fn history(&self, user_id: &str) -> Vec<ConversationTurn> {
        self.history.history(user_id).await
    }

    pub async fn stats(&self) -> RouterStats {
        let indexed_chunks = match self.services.retriever.count().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(error = %e, "retriever could not report its size");
                None
            }
        };

        RouterStats {
            active_conversations: self.history.active_users().await,
            indexed_chunks,
            retrieval_k: self.config.retrieval_k,
            history_capacity: self.config.history_capacity,
            services: self.config.services.clone(),
        }
    }
}

fn service_failure(step: &Step, error: Error) -> FailureKind {
    let service = step.target_service();
    warn!(
        action = step.action().as_str(),
        service = service.as_str(),
        error = %error,
        "step failed"
    );
    FailureKind::for_service(service)
}

fn unique_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for chunk in chunks {
        if !sources.contains(&chunk.source_id) {
            sources.push(chunk.source_id.clone());
        }
    }
    sources
}
