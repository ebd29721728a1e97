//! Per-request orchestration of a plant analysis.

use crate::ai::{CompletionService, OpenAiCompletionClient};
use crate::analysis;
use crate::models::{AnalysisRequest, AnalysisResponse, AnalyzeBody, Config};
use crate::{prompts, Result};
use chrono::{Local, NaiveDate};
use std::fmt;
use tracing::{debug, info, warn};

/// Stages a request moves through. Each is entered at most once; any stage
/// may end the request with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Prompting,
    Invoking,
    Interpreting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Prompting => "prompting",
            Stage::Invoking => "invoking",
            Stage::Interpreting => "interpreting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Runs validation, prompting, the model call and interpretation for one
/// request. Holds no per-request state, so one instance serves every request.
pub struct Analyzer {
    completion: Box<dyn CompletionService>,
}

impl Analyzer {
    /// Build an analyzer around any completion backend; tests inject
    /// [`crate::ai::MockCompletionClient`] here.
    pub fn new(completion: Box<dyn CompletionService>) -> Self {
        Self { completion }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        info!(
            "Completion provider: {} (model: {})",
            config.base_url, config.model
        );
        Ok(Self::new(Box::new(OpenAiCompletionClient::new_with_client(
            config.api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
            config.request_timeout,
            http_client,
        ))))
    }

    /// Analyze using today's date for the seasonal hint.
    pub async fn analyze(&self, body: AnalyzeBody) -> Result<AnalysisResponse> {
        self.analyze_on(body, Local::now().date_naive()).await
    }

    pub async fn analyze_on(&self, body: AnalyzeBody, today: NaiveDate) -> Result<AnalysisResponse> {
        let mut stage = Stage::Validating;
        let result = self.run(body, today, &mut stage).await;
        if let Err(e) = &result {
            warn!("Analysis failed while {}: {}", stage, e);
        }
        result
    }

    async fn run(
        &self,
        body: AnalyzeBody,
        today: NaiveDate,
        stage: &mut Stage,
    ) -> Result<AnalysisResponse> {
        let request = AnalysisRequest::from_body(body)?;
        debug!(
            "Validated request (image bytes: {:?}, land area: {:?})",
            request.image.byte_len(),
            request.land_area.as_ref().map(|l| l.value)
        );

        advance(stage, Stage::Prompting);
        let messages = prompts::build_prompt(&request, today);

        advance(stage, Stage::Invoking);
        info!("Analyzing plant image...");
        let reply = self.completion.complete(&messages).await?;
        info!("AI response received ({} chars)", reply.len());

        advance(stage, Stage::Interpreting);
        let response = analysis::interpret(&reply, request.land_area.as_ref());
        if let AnalysisResponse::Failure(_) = &response {
            warn!("Returning raw model output to the caller");
        }

        advance(stage, Stage::Done);
        Ok(response)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("{} -> {}", stage, next);
    *stage = next;
}
