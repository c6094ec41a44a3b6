use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use capsched::{
    client::SchedulerClient,
    config::{Cli, Command, Config, UpdateArgs},
    output::{OutputFormat, render},
    queue::Properties,
    store::QueueConfigStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cmd = cli.command.clone().unwrap_or(Command::Show);
    let format = cli.config.format;
    let mut store = build_store(&cli.config)?;

    match cmd {
        Command::Show => {
            store.fetch_all().await?;
            print(&store.snapshot(), format)
        }
        Command::ShowTag(args) => print(&store.fetch_by_tag(&args.tag).await?, format),
        Command::Tags => print(&store.list_tags().await?, format),
        Command::Queues => {
            store.fetch_all().await?;
            print(&store.queues(), format)
        }
        Command::Labels => print(&store.node_labels().await?, format),
        Command::Privilege => print(&store.privilege().await?, format),
        Command::Set(args) => {
            store.fetch_all().await?;
            let mut edits = store.properties();
            for key in &args.unset {
                edits.remove(key);
            }
            edits.extend(args.pairs);
            submit(&mut store, edits, args.update, format).await
        }
        Command::Replace(args) => {
            let raw = std::fs::read_to_string(&args.file)
                .with_context(|| format!("read {}", args.file.display()))?;
            let edits: Properties = serde_json::from_str(&raw).with_context(|| {
                format!("parse {} as a JSON object of strings", args.file.display())
            })?;
            store.fetch_all().await?;
            submit(&mut store, edits, args.update, format).await
        }
        Command::AddQueue(args) => {
            store.fetch_all().await?;
            apply_save_mark(&mut store, &args.update);
            store
                .create_queue(&args.parent, &args.name, args.update.note)
                .await?;
            finish_update(&mut store, format).await
        }
        Command::RemoveQueue(args) => {
            store.fetch_all().await?;
            apply_save_mark(&mut store, &args.update);
            store.delete_queue(&args.path, args.update.note).await?;
            finish_update(&mut store, format).await
        }
    }
}

fn build_store(config: &Config) -> Result<QueueConfigStore> {
    let options = config.client_options()?;
    info!(base_url = %options.base_url, "using scheduler configuration resource");
    let client = SchedulerClient::new(options)?;
    Ok(QueueConfigStore::new(client))
}

fn apply_save_mark(store: &mut QueueConfigStore, update: &UpdateArgs) {
    if let Some(marker) = &update.save_mark {
        store.set_save_mark(marker.clone());
    }
}

async fn submit(
    store: &mut QueueConfigStore,
    edits: Properties,
    update: UpdateArgs,
    format: OutputFormat,
) -> Result<()> {
    apply_save_mark(store, &update);
    store.submit_update(edits, update.note).await?;
    finish_update(store, format).await
}

/// Lets a pending activation finish before the process exits, then prints the new snapshot.
async fn finish_update(store: &mut QueueConfigStore, format: OutputFormat) -> Result<()> {
    if store.settle_activation().await == Some(false) {
        warn!("configuration saved but activation did not complete");
    }
    print(&store.snapshot(), format)
}

fn print<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    print!("{}", render(value, format)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
