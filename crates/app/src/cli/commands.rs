//! Subcommand implementations

use anyhow::{bail, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use audiogroups_core::domain::config::ConfigLoader;
use audiogroups_core::domain::classifier::AudioGroupsEngine;
use audiogroups_core::domain::rule;
use audiogroups_core::domain::settings::{ConfigWatcher, EngineSettings};
use audiogroups_core::domain::source::FileSource;
use audiogroups_core::domain::stream::{Axis, Direction, StreamAttributes};
use audiogroups_infra::routing::{InMemoryRoutingHost, SharedEngine};

/// Parse `KEY=VALUE`
pub fn parse_property(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got \"{}\"", text)),
    }
}

pub struct ClassifyRequest {
    pub direction: Direction,
    pub properties: Vec<(String, String)>,
    pub explicit_volume: bool,
    pub explicit_mute: bool,
}

fn source_for(settings: &EngineSettings, config: Option<PathBuf>) -> FileSource {
    match config {
        Some(path) => FileSource::resolve(&path),
        None => settings.config_source(),
    }
}

async fn load_engine(
    settings: &EngineSettings,
    config: Option<PathBuf>,
) -> anyhow::Result<AudioGroupsEngine> {
    let source = source_for(settings, config);
    let loader = ConfigLoader::load(&source)
        .await
        .with_context(|| format!("Failed to load {}", source.path().display()))?;

    Ok(loader.finalize(Arc::new(InMemoryRoutingHost::new()), settings.negation))
}

/// Pretty JSON view of the loaded model
fn render_json(engine: &AudioGroupsEngine) -> anyhow::Result<String> {
    serde_json::to_string_pretty(&engine.snapshot()).context("Failed to serialize the model")
}

pub async fn check(
    settings: &EngineSettings,
    config: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let engine = load_engine(settings, config).await?;

    if json {
        println!("{}", render_json(&engine)?);
        return Ok(());
    }

    println!("Audio groups ({}):", engine.groups().len());
    for group in engine.groups() {
        let definition = &group.definition;
        println!(
            "  {} \"{}\" volume: {}, mute: {}",
            definition.id,
            definition.description,
            definition.volume_control,
            definition.mute_control
        );
    }

    println!("Streams ({}), in match order:", engine.streams().len());
    for stream in engine.streams() {
        let rule = stream
            .rule
            .as_ref()
            .map(|expression| expression.to_string())
            .unwrap_or_else(|| "<never matches>".to_string());
        println!("  {}: {}", stream.id, rule);

        for axis in Axis::ALL {
            match (stream.group_name(axis), stream.binding(axis)) {
                (Some(_), Some(binding)) => println!("    {} -> {}", axis, binding.target),
                (Some(name), None) => println!("    {} -> {} (unresolved)", axis, name),
                (None, _) => {}
            }
        }
    }

    Ok(())
}

pub fn rule(text: &str) -> anyhow::Result<()> {
    let expression = rule::compile(text).with_context(|| format!("Invalid rule \"{}\"", text))?;

    println!("{}", expression);
    for (index, conjunction) in expression.conjunctions().iter().enumerate() {
        println!("  [{}] {} literal(s): {}", index, conjunction.literals().len(), conjunction);
    }
    Ok(())
}

pub async fn classify(
    settings: &EngineSettings,
    config: Option<PathBuf>,
    request: ClassifyRequest,
) -> anyhow::Result<()> {
    let engine = load_engine(settings, config).await?;

    let mut stream = StreamAttributes::new("cli", request.direction);
    for (key, value) in request.properties {
        stream = stream.with_property(key, value);
    }
    if request.explicit_volume {
        stream = stream.with_explicit_control(Axis::Volume);
    }
    if request.explicit_mute {
        stream = stream.with_explicit_control(Axis::Mute);
    }

    match engine.matching_rule(&stream) {
        Some(rule) => println!("Matched stream rule: {}", rule.id),
        None => println!("No stream rule matched"),
    }

    for axis in Axis::ALL {
        match engine.classify(&stream, axis) {
            Some(target) => println!("  {} -> {}", axis, target),
            None => println!("  {} -> default", axis),
        }
    }

    Ok(())
}

pub async fn watch(settings: &EngineSettings, config: Option<PathBuf>) -> anyhow::Result<()> {
    let source = source_for(settings, config);
    let path = if source.path().is_absolute() {
        source.path().to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read the working directory")?
            .join(source.path())
    };
    let source = FileSource::new(path.clone());

    let shared = SharedEngine::new(Arc::new(InMemoryRoutingHost::new()), settings.negation);
    if let Err(e) = shared.reload(&source).await {
        bail!("Initial load of {} failed: {}", path.display(), e);
    }

    let watcher = ConfigWatcher::new(path.clone()).await?;
    info!(path = %path.display(), "Watching configuration, press Ctrl-C to stop");

    tokio::select! {
        _ = shared.follow(&source, watcher.subscribe()) => {}
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
    }

    shared.teardown();
    info!("Audio groups torn down");
    Ok(())
}
