use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use orderscout::agent::{AutomationAgent, HttpAgent, MockAgent};
use orderscout::config::Config;
use orderscout::domain::OutcomeKind;
use orderscout::orchestrator::{Orchestrator, OrchestratorConfig, PassSummary};
use orderscout::store::{MemoryStore, RecordStore, SqliteStore};

mod cli;

use cli::Cli;
use cli::commands::{Commands, RunArgs};

fn setup_logging(default_level: &str) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("orderscout")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("orderscout.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn open_store(cli: &Cli, config: &Config) -> Result<SqliteStore> {
    let path = cli.database.as_ref().unwrap_or(&config.store.database);
    SqliteStore::open(path).context(format!("Failed to open database {}", path.display()))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let store = open_store(cli, config)?;

    match &cli.command {
        Commands::Run(args) => handle_run_command(store, args, cli.is_verbose(), config).await,
        Commands::Add { name, url } => handle_add_command(&store, name, url),
        Commands::Import { file } => handle_import_command(&store, file),
        Commands::Status => handle_status_command(&store),
        Commands::Show { id } => handle_show_command(&store, id),
        Commands::Reset { id, failed } => handle_reset_command(&store, id.as_deref(), *failed),
        Commands::Export { file } => handle_export_command(&store, file),
    }
}

async fn handle_run_command(store: SqliteStore, args: &RunArgs, verbose: bool, config: &Config) -> Result<()> {
    let mut pass_config = config.orchestrator_config();
    if let Some(concurrency) = args.concurrency {
        pass_config.concurrency = concurrency;
    }
    if let Some(batch_limit) = args.batch_limit {
        pass_config.batch_limit = batch_limit;
    }
    if let Some(secs) = args.timeout_secs {
        pass_config.task_timeout = std::time::Duration::from_secs(secs);
    }

    if args.dry_run {
        println!("{}", "Dry run: mock agent, results are not saved".yellow());
        let scratch = MemoryStore::from_pending(&store, pass_config.batch_limit).await?;
        return execute_pass(Arc::new(scratch), Arc::new(MockAgent::new()), pass_config, verbose).await;
    }

    let agent = HttpAgent::from_env(config.http_agent_config(), config.agent.api_key_env.as_deref())?;
    execute_pass(Arc::new(store), Arc::new(agent), pass_config, verbose).await
}

async fn execute_pass<S, A>(store: Arc<S>, agent: Arc<A>, pass_config: OrchestratorConfig, verbose: bool) -> Result<()>
where
    S: RecordStore + 'static,
    A: AutomationAgent + 'static,
{
    let orchestrator = Orchestrator::new(store, agent, pass_config)?;

    let stop = orchestrator.stop_handle();
    let signal_task = tokio::spawn(async move {
        stop.stop_on_interrupts(|| async {
            let received = tokio::signal::ctrl_c().await;
            if received.is_ok() {
                eprintln!(
                    "{}",
                    "Interrupted: no new companies will start (Ctrl-C again to exit now)".yellow()
                );
            }
            received
        })
        .await;
        eprintln!("{}", "Exiting without waiting for running tasks".red());
        std::process::exit(130);
    });

    let settings = orchestrator.config();
    println!(
        "{} concurrency {}, batch limit {}, timeout {}s",
        "Running pass:".cyan(),
        settings.concurrency,
        settings.batch_limit,
        settings.task_timeout.as_secs()
    );

    let result = orchestrator.run_pass().await;
    signal_task.abort();
    let summary = match result {
        Ok(summary) => summary,
        Err(e) if e.is_fatal() => bail!("Pass aborted before any company was processed: {}", e),
        Err(e) => return Err(e).context("Pass failed"),
    };

    print_summary(&summary, verbose);
    Ok(())
}

fn print_summary(summary: &PassSummary, verbose: bool) {
    println!("{} {}", "Pass complete:".green(), summary);
    if verbose {
        println!("  fetched:          {}", summary.fetched);
        println!("  admitted:         {}", summary.admitted);
        println!("  succeeded:        {}", summary.succeeded.to_string().green());
        println!("  parse failures:   {}", summary.parse_failed.to_string().yellow());
        println!("  exec failures:    {}", summary.execution_failed.to_string().red());
    }
    if summary.persist_failed > 0 {
        println!(
            "{} {} outcome(s) could not be written; those items stay pending",
            "Warning:".red(),
            summary.persist_failed
        );
    }
}

fn handle_add_command(store: &SqliteStore, name: &str, url: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("company name must not be empty");
    }
    let id = store.add_entity(name, url)?;
    info!("Added company {} as id {}", name, id);
    println!("{} {} (id {})", "Added:".green(), name, id);
    Ok(())
}

fn handle_import_command(store: &SqliteStore, file: &Path) -> Result<()> {
    let report = store
        .import_jsonl(file)
        .context(format!("Failed to import {}", file.display()))?;
    println!(
        "{} {} inserted, {} skipped",
        "Imported:".green(),
        report.inserted,
        report.skipped
    );
    Ok(())
}

fn handle_status_command(store: &SqliteStore) -> Result<()> {
    let counts = store.status_counts()?;
    println!("{}", "Companies by outcome".bold());
    println!("  {:<18} {}", "pending", counts.pending.to_string().cyan());
    println!("  {:<18} {}", OutcomeKind::Success, counts.success.to_string().green());
    println!("  {:<18} {}", OutcomeKind::ParseFailure, counts.parse_failure.to_string().yellow());
    println!(
        "  {:<18} {}",
        OutcomeKind::ExecutionFailure,
        counts.execution_failure.to_string().red()
    );
    println!("  {:<18} {}", "total", counts.total());
    Ok(())
}

fn handle_show_command(store: &SqliteStore, id: &str) -> Result<()> {
    let Some(row) = store.get(id)? else {
        bail!("no company with id {}", id);
    };

    println!("{} {} ({})", "Company:".green(), row.company_name, row.id);
    println!("  url:     {}", row.info_url);
    let state = match row.outcome_kind {
        Some(kind) if kind.is_failure() => kind.to_string().red(),
        Some(kind) => kind.to_string().green(),
        None => "pending".cyan(),
    };
    println!("  outcome: {}", state);
    if let Some(updated) = &row.updated_at {
        println!("  updated: {}", updated);
    }
    if let Some(info) = &row.history_order_info {
        let pretty = serde_json::from_str::<serde_json::Value>(info)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .unwrap_or_else(|_| info.clone());
        println!("{}", pretty);
    }
    if let Some(raw) = row.raw_result.as_deref().filter(|raw| !raw.is_empty()) {
        println!("{}", "Raw agent output:".yellow());
        println!("{}", raw);
    }
    Ok(())
}

fn handle_reset_command(store: &SqliteStore, id: Option<&str>, failed: bool) -> Result<()> {
    if failed {
        let count = store.reset_failed()?;
        println!("{} {} failed compan(ies) are pending again", "Reset:".green(), count);
        return Ok(());
    }
    let Some(id) = id else {
        bail!("give a company id or --failed");
    };
    store.reset(id)?;
    println!("{} company {} is pending again", "Reset:".green(), id);
    Ok(())
}

fn handle_export_command(store: &SqliteStore, file: &Path) -> Result<()> {
    let results = store.successful_results()?;
    let out = fs::File::create(file).context(format!("Failed to create {}", file.display()))?;
    let mut writer = BufWriter::new(out);
    for result in &results {
        serde_json::to_writer(&mut writer, result)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    println!("{} {} result(s) to {}", "Exported:".green(), results.len(), file.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref().unwrap_or("info")).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
