use std::path::Path;
use std::sync::Arc;

use agentlens_aggregator::Aggregator;
use agentlens_providers::SessionProvider;
use agentlens_types::AggregatorConfig;
use anyhow::{Context, Result};

use crate::args::{Cli, Commands, ProviderKind};

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Providers => providers(),
        Commands::Sessions { provider, log_root } => sessions(provider, &log_root),
        Commands::Metrics { provider, session_path } => metrics(provider, &session_path),
        Commands::Activity { session_path } => activity(&session_path),
        Commands::Patterns { provider, session_path } => patterns(provider, &session_path),
        Commands::Watch { provider, session_path, replay } => watch(provider, &session_path, replay),
    }
}

fn providers() -> Result<()> {
    let config = agentlens_runtime::Config::detect_providers()?;
    if config.providers.is_empty() {
        println!("No known provider directories found under $HOME.");
        return Ok(());
    }
    for (name, provider_config) in &config.providers {
        println!("{name}\t{}\tenabled={}", provider_config.log_root.display(), provider_config.enabled);
    }
    Ok(())
}

fn provider_for(kind: ProviderKind, root_or_db: &Path) -> Arc<dyn SessionProvider> {
    match kind {
        ProviderKind::WorkspaceJsonl => Arc::new(agentlens_providers::WorkspaceJsonlProvider::new(root_or_db)),
        ProviderKind::RolloutJsonl => Arc::new(agentlens_providers::RolloutJsonlProvider::new(root_or_db)),
        ProviderKind::EmbeddedDb => Arc::new(agentlens_providers::EmbeddedDbProvider::new(root_or_db)),
    }
}

fn provider_id(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::WorkspaceJsonl => "workspace_jsonl",
        ProviderKind::RolloutJsonl => "rollout_jsonl",
        ProviderKind::EmbeddedDb => "embedded_db",
    }
}

fn sessions(kind: ProviderKind, log_root: &Path) -> Result<()> {
    let provider = provider_for(kind, log_root);
    for session_path in provider.find_all_sessions(log_root) {
        let stats = provider.read_session_stats(&session_path);
        println!("{}\t{} bytes\t{} events", session_path.display(), stats.size_bytes, stats.line_or_row_count);
    }
    Ok(())
}

fn replay(kind: ProviderKind, session_path: &Path) -> Result<Aggregator> {
    let provider = provider_for(kind, session_path);
    let mut reader = provider.create_reader(session_path).context("failed to open session")?;
    let events = reader.read_all().context("failed to read session events")?;

    let config = AggregatorConfig { provider_id: provider_id(kind).to_string(), ..Default::default() };
    let mut aggregator = Aggregator::new(config);
    for event in &events {
        aggregator.process_session_event(event);
    }
    Ok(aggregator)
}

fn metrics(kind: ProviderKind, session_path: &Path) -> Result<()> {
    let aggregator = replay(kind, session_path)?;
    let metrics = aggregator.get_metrics();
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

fn activity(session_path: &Path) -> Result<()> {
    let status = agentlens_detect::classify(session_path);
    println!("{status:?}");
    Ok(())
}

fn patterns(kind: ProviderKind, session_path: &Path) -> Result<()> {
    let provider = provider_for(kind, session_path);
    let mut reader = provider.create_reader(session_path).context("failed to open session")?;
    let events = reader.read_all().context("failed to read session events")?;

    let mut clusterer = agentlens_detect::PatternClusterer::default();
    for event in &events {
        let summary = agentlens_providers::to_follow_event(event, provider_id(kind)).summary;
        if !summary.is_empty() {
            clusterer.observe(&summary);
        }
    }

    for pattern in clusterer.patterns() {
        println!("{}\t{}", pattern.count, pattern.template_string());
    }
    Ok(())
}

fn watch(kind: ProviderKind, session_path: &Path, replay: bool) -> Result<()> {
    let provider = provider_for(kind, session_path);
    let reader = provider.create_reader(session_path).context("failed to open session")?;

    let mut watcher = agentlens_runtime::jsonl_tail_watcher(
        reader,
        provider_id(kind),
        session_path.to_path_buf(),
        Box::new(|event| {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
        }),
    );

    watcher.start(replay)?;
    ctrlc::set_handler(move || {
        std::process::exit(0);
    })
    .context("failed to install Ctrl-C handler")?;
    loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}
