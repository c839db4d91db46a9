use settle_ai::config::{AppConfig, ClassifierKind};
use settle_ai::error::AppError;
use settle_ai::llm::ChatCompletionClient;
use settle_ai::workflows::settlement::{
    DeterministicClassifier, GenerativeClassifier, LoanType, OfferPipeline, PolicyRetriever,
};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) fn parse_classifier(raw: &str) -> Result<ClassifierKind, String> {
    ClassifierKind::parse(raw).ok_or_else(|| {
        format!("unknown classifier '{raw}' (expected deterministic or generative)")
    })
}

pub(crate) fn parse_loan_type(raw: &str) -> Result<LoanType, String> {
    LoanType::parse(raw).ok_or_else(|| {
        format!("unknown loan type '{raw}' (expected Personal Loan or Credit Card)")
    })
}

pub(crate) fn completion_client(config: &AppConfig) -> Result<ChatCompletionClient, AppError> {
    let client = ChatCompletionClient::new(&config.model)?;
    if !client.has_api_key() {
        warn!("no APP_MODEL_API_KEY or GOOGLE_API_KEY set; requests will be unauthenticated");
    }
    Ok(client)
}

/// Wire the pipeline for the chosen strategy. The generative path builds the
/// policy index up front so an unusable policy aborts before any case runs.
pub(crate) async fn build_pipeline(
    config: &AppConfig,
    kind: ClassifierKind,
) -> Result<OfferPipeline, AppError> {
    let pipeline = match kind {
        ClassifierKind::Deterministic => {
            OfferPipeline::new(Arc::new(DeterministicClassifier::default()))
        }
        ClassifierKind::Generative => {
            let retriever = Arc::new(PolicyRetriever::from_config(&config.policy));
            let index = retriever.warm_up().await?;
            info!(
                policy = %config.policy.source_path.display(),
                passages = index.len(),
                top_k = retriever.top_k(),
                "policy retriever ready"
            );

            let client = completion_client(config)?;
            info!(model = client.model(), "generative classifier ready");
            let classifier =
                GenerativeClassifier::new(Arc::new(client)).with_timeout(config.model.timeout);

            OfferPipeline::new(Arc::new(classifier)).with_retriever(retriever)
        }
    };

    Ok(pipeline.with_max_concurrency(config.pipeline.max_concurrency))
}
