use crate::infra::completion_client;
use clap::Args;
use settle_ai::config::AppConfig;
use settle_ai::error::AppError;
use settle_ai::workflows::settlement::PolicyRetriever;

#[derive(Args, Debug)]
pub(crate) struct PolicySearchArgs {
    /// Free-text query, e.g. "Credit Card DPD 120 lost my job"
    #[arg(long)]
    pub(crate) query: String,
    /// Number of passages to show (defaults to APP_RETRIEVAL_TOP_K)
    #[arg(long)]
    pub(crate) top_k: Option<usize>,
}

pub(crate) async fn search_policy(
    config: AppConfig,
    args: PolicySearchArgs,
) -> Result<(), AppError> {
    let retriever = PolicyRetriever::from_config(&config.policy);
    let top_k = args.top_k.unwrap_or_else(|| retriever.top_k()).max(1);

    let passages = retriever.search(&args.query, top_k).await?;
    println!(
        "Top {} passages from {} for \"{}\"",
        passages.len(),
        config.policy.source_path.display(),
        args.query
    );
    for (rank, passage) in passages.iter().enumerate() {
        println!("\n[{}] {}", rank + 1, passage);
    }

    Ok(())
}

pub(crate) async fn list_models(config: AppConfig) -> Result<(), AppError> {
    let client = completion_client(&config)?;
    let models = client.list_models().await?;

    println!("Models served by {}", config.model.base_url);
    for model in &models {
        let marker = if model.ends_with(client.model()) { "*" } else { " " };
        println!(" {marker} {model}");
    }

    Ok(())
}
