use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use hearth_backend::{Backend, BackendConfig};
use hearth_store::codec::decode;
use hearth_store::{AccountsState, BlogsState, SnapshotFile, SnapshotState, TodosState};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Inspect(args) => cmd_inspect(args, cli.format),
        Command::AddAccount(args) => cmd_add_account(args, cli.format),
        Command::DefaultConfig => cmd_default_config(),
    }
}

fn resolve_config(location: &Location) -> anyhow::Result<BackendConfig> {
    let mut config = match &location.config {
        Some(path) => BackendConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => BackendConfig::default(),
    };
    if let Some(dir) = &location.data_dir {
        config.data_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args.location)?;
    let backend = Backend::open(&config).context("opening stores")?;
    let handle = backend.start_background();

    println!(
        "{} Serving from {}",
        "✓".green().bold(),
        config.data_dir.display().to_string().bold()
    );
    println!(
        "  {} accounts, {} todos, {} posts",
        backend.accounts().len(),
        backend.todos().len(),
        backend.blogs().len()
    );
    println!(
        "  Autosave every {}s. Press {} to stop.",
        config.autosave_interval_secs,
        "Ctrl-C".yellow()
    );

    wait_for_shutdown().await?;

    let outcome = handle.shutdown().await;
    if !outcome.is_clean() {
        anyhow::bail!("final flush failed for: {}", outcome.failed.join(", "));
    }
    println!("{} Saved {}", "✓".green().bold(), outcome.flushed.join(", "));
    Ok(())
}

async fn wait_for_shutdown() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutdown requested");
    Ok(())
}

#[derive(Debug, Serialize)]
struct SnapshotSummary {
    store: &'static str,
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    counts: BTreeMap<&'static str, u64>,
}

fn summarize<S: SnapshotState>(
    path: &Path,
    count: impl FnOnce(&S) -> BTreeMap<&'static str, u64>,
) -> SnapshotSummary {
    let mut summary = SnapshotSummary {
        store: S::KIND,
        path: path.to_path_buf(),
        written_at: None,
        error: None,
        counts: BTreeMap::new(),
    };
    match SnapshotFile::new(path).read() {
        Ok(None) => summary.error = Some("missing".into()),
        Err(e) => summary.error = Some(e.to_string()),
        Ok(Some(bytes)) => match decode::<S>(&bytes) {
            Ok(decoded) => {
                summary.written_at = Some(decoded.written_at);
                summary.counts = count(&decoded.state);
            }
            Err(e) => summary.error = Some(e.to_string()),
        },
    }
    summary
}

fn inspect(config: &BackendConfig) -> Vec<SnapshotSummary> {
    vec![
        summarize::<AccountsState>(&config.accounts_path(), |s| {
            BTreeMap::from([
                ("accounts", s.accounts().len() as u64),
                ("admins", s.accounts().iter().filter(|a| a.is_admin).count() as u64),
                ("next_id", s.next_id()),
            ])
        }),
        summarize::<TodosState>(&config.todos_path(), |s| {
            let todos = s.todos();
            BTreeMap::from([
                ("todos", todos.len() as u64),
                ("completed", todos.iter().filter(|t| t.completed && !t.deleted).count() as u64),
                ("deleted", todos.iter().filter(|t| t.deleted).count() as u64),
                ("next_id", s.next_id()),
            ])
        }),
        summarize::<BlogsState>(&config.blogs_path(), |s| {
            let posts = s.posts();
            BTreeMap::from([
                ("posts", posts.len() as u64),
                ("private", posts.iter().filter(|p| p.private).count() as u64),
                ("comments", posts.iter().map(|p| p.comments.len() as u64).sum()),
                ("next_id", s.next_id()),
                ("next_comment_id", s.next_comment_id()),
            ])
        }),
    ]
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = resolve_config(&args.location)?;
    let summaries = inspect(&config);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("Data directory {}", config.data_dir.display().to_string().bold());
    for s in &summaries {
        match &s.error {
            Some(e) => println!("  {:<9} {}", s.store.bold(), e.red()),
            None => {
                let when = s
                    .written_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                println!("  {:<9} {} {}", s.store.bold(), "✓".green(), when.dimmed());
                for (name, value) in &s.counts {
                    println!("    {name}: {}", value.to_string().cyan());
                }
            }
        }
    }
    Ok(())
}

fn cmd_add_account(args: AddAccountArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = resolve_config(&args.location)?;
    let backend = Backend::open(&config).context("opening stores")?;
    let account = backend.accounts().register(&args.name, &args.secret)?;

    let outcome = backend.flush_all();
    if !outcome.is_clean() {
        anyhow::bail!("account created but not saved: {}", outcome.failed.join(", "));
    }

    if format == OutputFormat::Json {
        let value = serde_json::json!({
            "id": account.id,
            "display_name": account.display_name,
            "is_admin": account.is_admin,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "{} Registered {} as {}",
            "✓".green().bold(),
            account.display_name.bold(),
            account.id.to_string().yellow()
        );
    }
    Ok(())
}

fn cmd_default_config() -> anyhow::Result<()> {
    print!("{}", BackendConfig::default().to_toml_string()?);
    Ok(())
}
