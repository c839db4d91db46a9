use crate::inspect::{list_models, search_policy, PolicySearchArgs};
use crate::offers::{quote_offer, run_offers, QuoteArgs, RunArgs};
use clap::{Parser, Subcommand};
use settle_ai::config::AppConfig;
use settle_ai::error::AppError;
use settle_ai::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "settle-ai",
    about = "Determine minimum acceptable settlement offers for delinquent borrowers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price settlement offers for a roster of chat scenarios
    Offers {
        #[command(subcommand)]
        command: OffersCommand,
    },
    /// Inspect the settlement policy corpus
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },
    /// Inspect the configured completion endpoint
    Models {
        #[command(subcommand)]
        command: ModelsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum OffersCommand {
    /// Run the full batch and write the submission CSV
    Run(RunArgs),
    /// Price a single ad-hoc case and print its audit record
    Quote(QuoteArgs),
}

#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// Show the policy passages retrieved for a query
    Search(PolicySearchArgs),
}

#[derive(Subcommand, Debug)]
enum ModelsCommand {
    /// List model ids served by the completion endpoint
    List,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Offers {
            command: OffersCommand::Run(args),
        } => run_offers(config, args).await,
        Command::Offers {
            command: OffersCommand::Quote(args),
        } => quote_offer(config, args).await,
        Command::Policy {
            command: PolicyCommand::Search(args),
        } => search_policy(config, args).await,
        Command::Models {
            command: ModelsCommand::List,
        } => list_models(config).await,
    }
}
