use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use appeals_store::{
    config::{load_settings_from, prepare_base_url, DEFAULT_SETTINGS_FILE},
    AppealsStore, Filters, PaginationUpdate, SortBy, SortOrder, StoreEvent,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use shared::domain::{AppealFields, AppealId, PremiseId};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const REFRESH_WAIT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long)]
    api_base_url: Option<String>,
    #[arg(long)]
    auth_token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one page of appeals and print it sorted.
    List {
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        page_size: Option<u32>,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        premise_id: Option<i64>,
        #[arg(long, default_value = "number")]
        sort_by: SortBy,
        #[arg(long, default_value = "asc")]
        order: SortOrder,
    },
    Premises {
        #[arg(long, default_value = "")]
        search: String,
    },
    Apartments {
        premise_id: i64,
    },
    /// Create an appeal from a JSON object of fields.
    Create {
        fields: String,
    },
    /// Patch an appeal with a JSON object of fields.
    Update {
        appeal_id: i64,
        fields: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings_from(&cli.config)?;
    if let Some(url) = cli.api_base_url {
        settings.api_base_url = prepare_base_url(&url)?;
    }
    if let Some(token) = cli.auth_token {
        settings.auth_token = Some(token);
    }
    let store = AppealsStore::from_settings(&settings)?;

    match cli.command {
        Command::List {
            page,
            page_size,
            search,
            premise_id,
            sort_by,
            order,
        } => {
            store
                .set_pagination(PaginationUpdate {
                    page: Some(page),
                    page_size,
                    total: None,
                })
                .await;
            store
                .set_filters(&Filters {
                    search,
                    premise_id: premise_id.map(PremiseId),
                })
                .await;
            store.set_sort_by(sort_by).await;
            store.set_sort_order(order).await;

            store
                .fetch_appeals()
                .await
                .context("failed to load appeals")?;
            let state = store.snapshot().await;
            print_json(&json!({
                "pagination": state.pagination(),
                "appeals": state.sorted_appeals(),
            }))?;
        }
        Command::Premises { search } => {
            store
                .fetch_premises(&search)
                .await
                .context("failed to load premises")?;
            print_json(&store.read(|state| state.premises().to_vec()).await)?;
        }
        Command::Apartments { premise_id } => {
            store
                .fetch_apartments(PremiseId(premise_id))
                .await
                .context("failed to load apartments")?;
            print_json(&store.read(|state| state.apartments().to_vec()).await)?;
        }
        Command::Create { fields } => {
            let fields = parse_fields(&fields)?;
            let mut events = store.subscribe_events();
            store
                .create_appeal(&fields)
                .await
                .context("failed to create appeal")?;
            println!("appeal created");
            wait_for_refresh(&mut events).await;
        }
        Command::Update { appeal_id, fields } => {
            let fields = parse_fields(&fields)?;
            let mut events = store.subscribe_events();
            store
                .update_appeal(AppealId(appeal_id), &fields)
                .await
                .with_context(|| format!("failed to update appeal {appeal_id}"))?;
            println!("appeal {appeal_id} updated");
            wait_for_refresh(&mut events).await;
        }
    }

    Ok(())
}

fn parse_fields(raw: &str) -> Result<AppealFields> {
    serde_json::from_str(raw).context("appeal fields must be a JSON object")
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// The store refreshes in the background after a write; give it a chance to
// finish before the runtime shuts down.
async fn wait_for_refresh(events: &mut broadcast::Receiver<StoreEvent>) {
    let waited = tokio::time::timeout(REFRESH_WAIT, async {
        loop {
            match events.recv().await {
                Ok(StoreEvent::AppealsLoaded { count, total }) => {
                    info!("cli: list refreshed count={count} total={total}");
                    break;
                }
                Ok(StoreEvent::Failed {
                    operation: "fetch_appeals",
                    message,
                }) => {
                    warn!("cli: list refresh failed err={message}");
                    break;
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
    .await;

    if waited.is_err() {
        warn!("cli: gave up waiting for list refresh");
    }
}
