//! Reclaim workflow engine CLI.
//!
//! Usage:
//!     reclaim-engine --database sqlite://reclaim.db report-found --name "iPhone" --category Phone --serial SN123

use std::sync::Arc;

use clap::{Parser, Subcommand};
use reclaim_protocol::{ItemKind, ItemStatus};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reclaim_engine::{
    ContactUpdate, Engine, EngineConfig, ItemSearch, LogNotifier, NewFoundItem, NewLostItem,
    DEFAULT_DATABASE_URL,
};

#[derive(Parser, Debug)]
#[command(
    name = "reclaim-engine",
    about = "Matching & claim workflow engine for the Reclaim lost & found tracker"
)]
struct Args {
    /// Database connection string
    #[arg(long, env = "RECLAIM_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report a lost item (scans for open found counterparts)
    ReportLost {
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        serial: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Reporting user id; omit for anonymous reports
        #[arg(long)]
        user: Option<i64>,
    },
    /// Report a found item (scans for open lost counterparts)
    ReportFound {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        serial: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        user: Option<i64>,
    },
    /// Finalize a match: claim it, close both items, record the return
    Claim {
        match_id: i64,
        /// Acting user id recorded on the return
        #[arg(long)]
        user: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Directly edit an item's status (guarded; claiming cascades to
    /// same-serial items)
    SetStatus {
        kind: ItemKind,
        id: i64,
        status: ItemStatus,
    },
    /// Patch an item's contact fields
    UpdateContact {
        kind: ItemKind,
        id: i64,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// List lost items, most recent first
    ListLost {
        #[arg(long)]
        status: Option<ItemStatus>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// List found items, most recent first
    ListFound {
        #[arg(long)]
        status: Option<ItemStatus>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Search lost items by title/category/color substrings
    SearchLost {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Search found items by name/category/color substrings
    SearchFound {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Exact serial-number lookup across both item tables
    SearchSerial { serial: String },
    /// List the distinct categories in use
    Categories,
    /// List matches, most recent first
    Matches {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// List recorded returns, most recent first
    Returns {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reclaim_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = EngineConfig {
        database_url: args.database,
    };
    let engine = Engine::connect(&config, Arc::new(LogNotifier)).await?;

    match args.command {
        Command::ReportLost {
            title,
            category,
            description,
            color,
            serial,
            first_name,
            last_name,
            phone,
            email,
            user,
        } => {
            let item = engine
                .report_lost(NewLostItem {
                    title,
                    category,
                    description,
                    color,
                    serial_number: serial,
                    first_name,
                    last_name,
                    loster_phone: phone,
                    loster_email: email,
                    user_id: user,
                })
                .await?;
            print_json(&item)?;
        }
        Command::ReportFound {
            name,
            category,
            description,
            color,
            serial,
            first_name,
            last_name,
            phone,
            email,
            user,
        } => {
            let item = engine
                .report_found(NewFoundItem {
                    name,
                    category,
                    description,
                    color,
                    serial_number: serial,
                    first_name,
                    last_name,
                    founder_phone: phone,
                    founder_email: email,
                    user_id: user,
                })
                .await?;
            print_json(&item)?;
        }
        Command::Claim {
            match_id,
            user,
            notes,
        } => {
            let record = engine.claim(match_id, user, notes).await?;
            print_json(&record)?;
        }
        Command::SetStatus { kind, id, status } => {
            engine.set_item_status(kind, id, status).await?;
            print_json(&json!({ "kind": kind, "id": id, "status": status }))?;
        }
        Command::UpdateContact {
            kind,
            id,
            first_name,
            last_name,
            phone,
            email,
        } => {
            engine
                .update_contact(
                    kind,
                    id,
                    &ContactUpdate {
                        first_name,
                        last_name,
                        phone,
                        email,
                    },
                )
                .await?;
            print_json(&json!({ "kind": kind, "id": id, "updated": true }))?;
        }
        Command::ListLost { status, limit } => {
            print_json(&engine.items().list_lost(status, limit).await?)?;
        }
        Command::ListFound { status, limit } => {
            print_json(&engine.items().list_found(status, limit).await?)?;
        }
        Command::SearchLost {
            name,
            category,
            color,
        } => {
            let filter = ItemSearch {
                name,
                category,
                color,
            };
            print_json(&engine.items().search_lost(&filter).await?)?;
        }
        Command::SearchFound {
            name,
            category,
            color,
        } => {
            let filter = ItemSearch {
                name,
                category,
                color,
            };
            print_json(&engine.items().search_found(&filter).await?)?;
        }
        Command::SearchSerial { serial } => {
            let lost = engine.items().find_lost_by_serial(&serial, None).await?;
            let found = engine.items().find_found_by_serial(&serial, None).await?;
            print_json(&json!({ "lost": lost, "found": found }))?;
        }
        Command::Categories => {
            print_json(&engine.items().categories().await?)?;
        }
        Command::Matches { limit } => {
            print_json(&engine.matches().list(limit).await?)?;
        }
        Command::Returns { limit } => {
            print_json(&engine.returns().list(limit).await?)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
