//! Execution plans
//!
//! `PlanBuilder` holds the intent-to-steps table. A plan's capability flags,
//! latency class and cost are derived from its steps when the plan is built,
//! so they cannot disagree with the steps they describe.

use serde::Serialize;

use crate::calculator::extract_expression;
use crate::classifier::Intent;
use crate::templates::TemplateKind;

/// Action tag of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    SearchCorpus,
    Generate,
    Caption,
    Template,
    EvaluateExpression,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::SearchCorpus => "SEARCH_CORPUS",
            Action::Generate => "GENERATE",
            Action::Caption => "CAPTION",
            Action::Template => "TEMPLATE",
            Action::EvaluateExpression => "EVALUATE_EXPRESSION",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Action::SearchCorpus => "Search knowledge base",
            Action::Generate => "Generate response",
            Action::Caption => "Caption image",
            Action::Template => "Return canned reply",
            Action::EvaluateExpression => "Evaluate expression",
        }
    }
}

/// Service a step runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Template,
    Calculator,
    Retrieval,
    Generation,
    Vision,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Template => "template",
            Service::Calculator => "calculator",
            Service::Retrieval => "retrieval",
            Service::Generation => "generation",
            Service::Vision => "vision",
        }
    }

    /// Whether running on this service counts as an external model call
    pub fn is_model_call(&self) -> bool {
        matches!(self, Service::Retrieval | Service::Generation | Service::Vision)
    }

    /// Per-step estimate of (seconds, MB, compute units)
    fn cost(&self) -> PlanCost {
        let (time_seconds, memory_mb, compute_units) = match self {
            Service::Template => (0.001, 0.0, 0.1),
            Service::Calculator => (0.001, 0.0, 0.1),
            Service::Retrieval => (0.05, 50.0, 1.0),
            Service::Generation => (3.0, 2000.0, 10.0),
            Service::Vision => (2.0, 1000.0, 8.0),
        };
        PlanCost {
            time_seconds,
            memory_mb,
            compute_units,
        }
    }
}

/// What feeds a GENERATE step besides its prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationContext {
    /// Chunks from the preceding SEARCH_CORPUS step
    Retrieved,
    /// The user's conversation, serialized into the prompt
    History,
    /// The raw query with the most recent turns attached
    RecentTurns,
}

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    Template { reply: TemplateKind },
    EvaluateExpression { expression: String },
    SearchCorpus { query: String, k: usize },
    Generate { context: GenerationContext },
    Caption,
}

impl Step {
    pub fn action(&self) -> Action {
        match self {
            Step::Template { .. } => Action::Template,
            Step::EvaluateExpression { .. } => Action::EvaluateExpression,
            Step::SearchCorpus { .. } => Action::SearchCorpus,
            Step::Generate { .. } => Action::Generate,
            Step::Caption => Action::Caption,
        }
    }

    pub fn target_service(&self) -> Service {
        match self {
            Step::Template { .. } => Service::Template,
            Step::EvaluateExpression { .. } => Service::Calculator,
            Step::SearchCorpus { .. } => Service::Retrieval,
            Step::Generate { .. } => Service::Generation,
            Step::Caption => Service::Vision,
        }
    }
}

/// Rough expected latency of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyClass {
    Instant,
    Fast,
    Moderate,
    Slow,
}

impl LatencyClass {
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds < 0.01 {
            LatencyClass::Instant
        } else if seconds < 1.0 {
            LatencyClass::Fast
        } else if seconds < 3.0 {
            LatencyClass::Moderate
        } else {
            LatencyClass::Slow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LatencyClass::Instant => "instant",
            LatencyClass::Fast => "fast",
            LatencyClass::Moderate => "moderate",
            LatencyClass::Slow => "slow",
        }
    }
}

/// Estimated resources for running a plan, in relative units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PlanCost {
    pub time_seconds: f64,
    pub memory_mb: f64,
    pub compute_units: f64,
}

impl std::ops::Add for PlanCost {
    type Output = PlanCost;

    fn add(self, other: PlanCost) -> PlanCost {
        PlanCost {
            time_seconds: self.time_seconds + other.time_seconds,
            memory_mb: self.memory_mb + other.memory_mb,
            compute_units: self.compute_units + other.compute_units,
        }
    }
}

/// Ordered steps plus the flags and estimates derived from them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    intent: Intent,
    steps: Vec<Step>,
    needs_retrieval: bool,
    needs_generation: bool,
    needs_vision: bool,
    latency: LatencyClass,
    cost: PlanCost,
}

impl ExecutionPlan {
    pub fn new(intent: Intent, steps: Vec<Step>) -> Self {
        let uses = |service: Service| steps.iter().any(|s| s.target_service() == service);
        let needs_retrieval = uses(Service::Retrieval);
        let needs_generation = uses(Service::Generation);
        let needs_vision = uses(Service::Vision);

        let cost = steps
            .iter()
            .map(|s| s.target_service().cost())
            .fold(PlanCost::default(), |acc, c| acc + c);

        Self {
            intent,
            needs_retrieval,
            needs_generation,
            needs_vision,
            latency: LatencyClass::from_seconds(cost.time_seconds),
            cost,
            steps,
        }
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn actions(&self) -> Vec<Action> {
        self.steps.iter().map(Step::action).collect()
    }

    pub fn needs_retrieval(&self) -> bool {
        self.needs_retrieval
    }

    pub fn needs_generation(&self) -> bool {
        self.needs_generation
    }

    pub fn needs_vision(&self) -> bool {
        self.needs_vision
    }

    pub fn latency(&self) -> LatencyClass {
        self.latency
    }

    pub fn cost(&self) -> PlanCost {
        self.cost
    }

    /// Number of steps that will call an external model service
    pub fn model_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.target_service().is_model_call())
            .count()
    }

    /// Human-readable description of what running this plan would do
    pub fn explain(&self) -> String {
        let mut lines = vec![format!("Query Intent: {}", self.intent.display_name())];

        match self.steps.as_slice() {
            [Step::Template { .. }] => lines.push("Strategy: Template response (fastest)".to_string()),
            [Step::EvaluateExpression { .. }] => {
                lines.push("Strategy: Local arithmetic (no model calls)".to_string())
            }
            steps => {
                lines.push("Execution Steps:".to_string());
                for (i, step) in steps.iter().enumerate() {
                    lines.push(format!(
                        "  {}. {} using {}",
                        i + 1,
                        step.action().describe(),
                        step.target_service().as_str()
                    ));
                }
            }
        }

        lines.push(format!(
            "Estimated Time: {:.2}s ({})",
            self.cost.time_seconds,
            self.latency.as_str()
        ));

        lines.join("\n")
    }
}

/// Builds plans from the fixed intent table
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    retrieval_k: usize,
}

impl PlanBuilder {
    pub fn new(retrieval_k: usize) -> Self {
        Self { retrieval_k }
    }

    pub fn retrieval_k(&self) -> usize {
        self.retrieval_k
    }

    /// Plan for a classified text query
    pub fn build_plan(&self, intent: Intent, query: &str) -> ExecutionPlan {
        let steps = match intent {
            Intent::Greeting => vec![Step::Template {
                reply: TemplateKind::detect(query),
            }],
            Intent::KnowledgeSearch => vec![
                Step::SearchCorpus {
                    query: query.trim().to_string(),
                    k: self.retrieval_k,
                },
                Step::Generate {
                    context: GenerationContext::Retrieved,
                },
            ],
            Intent::ImageAnalysis => vec![Step::Caption],
            Intent::Calculation => vec![Step::EvaluateExpression {
                expression: extract_expression(query),
            }],
            Intent::Summarization => vec![Step::Generate {
                context: GenerationContext::History,
            }],
            Intent::GeneralChat => vec![Step::Generate {
                context: GenerationContext::RecentTurns,
            }],
        };

        ExecutionPlan::new(intent, steps)
    }

    /// Plan for image input. Images never go through text classification;
    /// this is the only way an IMAGE_ANALYSIS plan is produced for a request.
    pub fn build_image_plan(&self) -> ExecutionPlan {
        self.build_plan(Intent::ImageAnalysis, "")
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new(3)
    }
}
