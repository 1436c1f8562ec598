use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use price_inventory_client::AppState;
use price_inventory_client::config::ClientConfig;
use price_inventory_client::error::ClientError;
use price_inventory_client::infrastructure::storage;
use price_inventory_client::models::{ChatReply, CounterType, PollOutcome, ProcessingStatus};
use price_inventory_client::services::chat::{self, PricingChatClient};
use price_inventory_client::services::quota::{self, QuotaClient, QuotaUploadGate};
use price_inventory_client::services::scheduler::PollScheduler;
use price_inventory_client::services::upload::UploadGate;
use price_inventory_client::utils::validation;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Upload spreadsheets for pricing and fetch the results", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a spreadsheet (.xls, .xlsx, .xlsm, .csv, up to 1 MiB)
    Upload {
        path: PathBuf,

        /// Keep polling until the result file is available
        #[arg(short, long)]
        watch: bool,

        /// Do not consult the quota service
        #[arg(long)]
        skip_quota: bool,
    },
    /// Poll the bucket and report the latest result
    Watch {
        /// Give up after this many seconds (0 waits forever)
        #[arg(short, long, default_value_t = 0)]
        timeout_secs: u64,
    },
    /// List the files related to the latest upload
    Files,
    /// Print a signed download link, or save the file with --output
    Download {
        key: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Ask the pricing assistant for a cost estimate
    Chat {
        query: Vec<String>,

        #[arg(long)]
        skip_quota: bool,
    },
    /// Show usage counters
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "price_inventory_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env();
    let http = reqwest::Client::new();

    match args.command {
        Command::Upload {
            path,
            watch,
            skip_quota,
        } => {
            let gate = (!skip_quota)
                .then(|| quota_client(&config, &http))
                .flatten()
                .map(|(client, email)| {
                    QuotaUploadGate::new(client, email, config.provider_user_id.clone())
                });

            let state = AppState::new(storage::setup_storage(&config).await, config.clone());
            let receipt = state
                .upload_service()
                .upload_path_gated(&path, gate.as_ref().map(|g| g as &dyn UploadGate))
                .await?;
            println!("Upload Successful! ({} bytes as {})", receipt.size, receipt.key);

            if watch {
                println!("Processing...");
                watch_until_complete(&state, None).await?;
            }
        }
        Command::Watch { timeout_secs } => {
            let state = AppState::new(storage::setup_storage(&config).await, config.clone());
            let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
            watch_until_complete(&state, timeout).await?;
        }
        Command::Files => {
            let state = AppState::new(storage::setup_storage(&config).await, config.clone());
            let outcome = state.tracker.poll(state.storage.as_ref()).await?;
            print_files(&outcome);
        }
        Command::Download { key, output } => {
            let state = AppState::new(storage::setup_storage(&config).await, config.clone());
            let downloads = state.download_service();
            match output {
                Some(path) => {
                    let size = downloads.download_to(&http, &key, &path).await?;
                    println!("Saved {} ({} bytes)", path.display(), size);
                }
                None => println!("{}", downloads.download_link(&key).await?),
            }
        }
        Command::Chat { query, skip_quota } => {
            let endpoint = config
                .chat_api_url
                .clone()
                .ok_or_else(|| ClientError::Config("CHAT_API_URL must be set".to_string()))?;
            let query = query.join(" ");
            validation::validate_chat_input(&query).map_err(ClientError::from)?;

            if !skip_quota {
                if let Some((client, email)) = quota_client(&config, &http) {
                    let status = client
                        .check_status(&email, config.provider_user_id.as_deref())
                        .await?;
                    quota::ensure_can_query(&status)?;
                    match client.increment_counter(&email, CounterType::QueryCount).await {
                        Ok(status) => print_usage(&status),
                        Err(e) => warn!("Could not update query counter: {}", e),
                    }
                }
            }

            match PricingChatClient::new(http.clone(), endpoint).ask(&query).await? {
                ChatReply::Estimates(estimates) => {
                    for (index, estimate) in estimates.iter().enumerate() {
                        println!("{}", chat::render_estimate(index, estimate));
                    }
                }
                ChatReply::Error(message) => println!("AI: {}", message),
            }
        }
        Command::Status => {
            let (client, email) = quota_client(&config, &http)
                .ok_or_else(|| {
                    ClientError::Config("STATUS_API_URL and USER_EMAIL must be set".to_string())
                })?;
            let status = client
                .check_status(&email, config.provider_user_id.as_deref())
                .await
                .context("checking usage status")?;
            print_usage(&status);
        }
    }

    Ok(())
}

fn quota_client(config: &ClientConfig, http: &reqwest::Client) -> Option<(QuotaClient, String)> {
    let endpoint = config.status_api_url.clone()?;
    let email = config.user_email.clone()?;
    Some((
        QuotaClient::new(http.clone(), endpoint, config.api_token.clone()),
        email,
    ))
}

fn print_usage(status: &price_inventory_client::models::QuotaStatus) {
    println!(
        "Uploads {}/{} | Queries {}/{} | {} tier",
        status.upload_count,
        status.max_uploads,
        status.query_count,
        status.max_queries,
        status.tier()
    );
    if status.is_subscribed {
        if let (Some(uploads), Some(queries)) = (status.remaining_uploads, status.remaining_queries)
        {
            println!("Remaining: {} uploads, {} queries", uploads, queries);
        }
    }
}

fn print_files(outcome: &PollOutcome) {
    if outcome.related.is_empty() {
        println!("No files yet.");
        return;
    }
    for key in outcome.related.keys() {
        println!("{}", key);
    }
}

/// Polls on the configured interval until the current session's result shows
/// up, the timeout passes, or Ctrl+C.
async fn watch_until_complete(state: &AppState, timeout: Option<Duration>) -> anyhow::Result<()> {
    let poller = state.poller();
    let mut outcomes = poller.subscribe();
    let mut scheduler = PollScheduler::start(poller, state.config.poll_interval);

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let result = loop {
        tokio::select! {
            changed = outcomes.changed() => {
                if changed.is_err() {
                    break Err(anyhow!("poller stopped unexpectedly"));
                }
                let Some(outcome) = outcomes.borrow_and_update().clone() else {
                    continue;
                };
                if outcome.processing_complete {
                    println!("Processing Complete!");
                }
                match (outcome.status, &outcome.latest_result) {
                    (ProcessingStatus::Processing, _) => info!("Processing..."),
                    (_, Some(result)) => {
                        print_files(&outcome);
                        println!("Now you can download your file: {}", result);
                        break Ok(());
                    }
                    (ProcessingStatus::Idle, None) => info!("Waiting for a result file..."),
                    _ => {}
                }
            }
            _ = &mut deadline => {
                break Err(anyhow!("no result file appeared before the timeout"));
            }
            _ = signal::ctrl_c() => {
                info!("⌨️  Ctrl+C received, stopping poller...");
                break Ok(());
            }
        }
    };

    scheduler.stop().await;
    result
}
