//! Integration tests for configuration loading and stream classification
//!
//! These tests drive the full path from configuration text through the
//! in-memory routing host to per-axis binding decisions.

use std::sync::Arc;
use tempfile::TempDir;
use audiogroups_core::domain::{
    compile, Axis, BindingTarget, ConfigLoader, Direction, FileSource, GroupControl,
    InitialControlHook, NegationPolicy, ParseError, StreamAttributes,
};
use audiogroups_infra::routing::{InMemoryRoutingHost, SharedEngine};

const DESKTOP: &str = "\
# Desktop audio groups
[General]
audio-groups = media notifications system
streams = paplay_stream music_player notification_sounds calls broken_rule everything

[AudioGroup media]
description = Media players
volume-control = create
mute-control = bind:AudioGroup:system

[AudioGroup notifications]
description = Notification sounds
volume-control = create
mute-control = create

[AudioGroup system]
mute-control = create

[Stream paplay_stream]
match = (property application.process.binary=paplay)
audio-group-for-volume = media
audio-group-for-mute = media

[Stream music_player]
match = ((property media.role=music AND direction output) OR (property media.role=video AND direction output))
audio-group-for-volume = media
audio-group-for-mute = system

[Stream notification_sounds]
match = (property media.role=event)
audio-group-for-volume = notifications
audio-group-for-mute = notifications

[Stream calls]
match = (property media.role=phone)
audio-group-for-volume = voip

[Stream broken_rule]
match = (property media.role)
audio-group-for-volume = media

[Stream everything]
match = (direction input OR direction output)
audio-group-for-mute = system
";

fn desktop(host: Arc<InMemoryRoutingHost>) -> audiogroups_core::domain::AudioGroupsEngine {
    ConfigLoader::load_str("desktop.conf", DESKTOP)
        .unwrap()
        .finalize(host, NegationPolicy::Ignore)
}

fn playback(role: &str) -> StreamAttributes {
    StreamAttributes::new(role, Direction::Output).with_property("media.role", role)
}

// ============================================================================
// LOADING
// ============================================================================

#[test]
fn test_groups_materialized_in_declaration_order() {
    let host = Arc::new(InMemoryRoutingHost::new());
    let engine = desktop(host.clone());

    assert_eq!(host.group_ids(), vec!["media", "notifications", "system"]);
    assert_eq!(host.active_count(), 3);

    let media = host.group("media").unwrap();
    assert_eq!(media.description, "Media players");
    assert_eq!(media.control(Axis::Volume), Some(&GroupControl::Own));
    assert_eq!(
        media.control(Axis::Mute),
        Some(&GroupControl::Bind(BindingTarget::new("AudioGroup", "system", "mute_control")))
    );

    let ids: Vec<_> = engine.streams().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["paplay_stream", "music_player", "notification_sounds", "calls", "broken_rule", "everything"]
    );
}

#[test]
fn test_group_rejected_by_host_is_skipped() {
    let host = Arc::new(InMemoryRoutingHost::new().failing_activation("notifications"));
    let engine = desktop(host.clone());

    assert_eq!(host.group_ids(), vec!["media", "system"]);
    assert!(engine.group("notifications").is_none());

    let event = playback("event");
    assert_eq!(engine.classify(&event, Axis::Volume), None);
    assert_eq!(engine.classify(&event, Axis::Mute), None);
}

#[tokio::test]
async fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio-groups.conf");
    tokio::fs::write(&path, DESKTOP).await.unwrap();

    let loader = ConfigLoader::load(&FileSource::resolve(&path)).await.unwrap();
    assert_eq!(loader.declared_groups(), ["media", "notifications", "system"]);

    let engine = loader.finalize(Arc::new(InMemoryRoutingHost::new()), NegationPolicy::Ignore);
    assert_eq!(engine.streams().len(), 6);
}

#[tokio::test]
async fn test_missing_file_loads_empty_model() {
    let temp_dir = TempDir::new().unwrap();
    let source = FileSource::new(temp_dir.path().join("nothing.conf"));

    let host = Arc::new(InMemoryRoutingHost::new());
    let engine = ConfigLoader::load(&source)
        .await
        .unwrap()
        .finalize(host.clone(), NegationPolicy::Ignore);

    assert!(engine.groups().is_empty());
    assert!(host.group_ids().is_empty());
    assert_eq!(engine.classify(&playback("music"), Axis::Volume), None);
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[test]
fn test_paplay_stream() {
    let engine = desktop(Arc::new(InMemoryRoutingHost::new()));
    let stream = StreamAttributes::new("paplay", Direction::Output)
        .with_property("application.process.binary", "paplay");

    assert_eq!(
        engine.classify(&stream, Axis::Volume),
        Some(BindingTarget::audio_group("media", Axis::Volume))
    );
    assert_eq!(
        engine.classify(&stream, Axis::Mute),
        Some(BindingTarget::audio_group("media", Axis::Mute))
    );
}

#[test]
fn test_disjunction_of_conjunctions() {
    let engine = desktop(Arc::new(InMemoryRoutingHost::new()));

    assert_eq!(
        engine.matching_rule(&playback("video")).map(|r| r.id.as_str()),
        Some("music_player")
    );

    // Recording with role=music fails the direction literal and falls through
    let recording = StreamAttributes::new("rec", Direction::Input).with_property("media.role", "music");
    assert_eq!(
        engine.matching_rule(&recording).map(|r| r.id.as_str()),
        Some("everything")
    );
    assert_eq!(engine.classify(&recording, Axis::Volume), None);
    assert_eq!(
        engine.classify(&recording, Axis::Mute),
        Some(BindingTarget::audio_group("system", Axis::Mute))
    );
}

#[test]
fn test_first_matching_rule_wins() {
    let engine = desktop(Arc::new(InMemoryRoutingHost::new()));
    let stream = playback("music").with_property("application.process.binary", "paplay");

    assert_eq!(
        engine.classify(&stream, Axis::Mute),
        Some(BindingTarget::audio_group("media", Axis::Mute))
    );
}

#[test]
fn test_unresolved_group_leaves_axis_unbound() {
    let engine = desktop(Arc::new(InMemoryRoutingHost::new()));
    let phone = playback("phone");

    assert_eq!(engine.matching_rule(&phone).map(|r| r.id.as_str()), Some("calls"));
    assert_eq!(engine.classify(&phone, Axis::Volume), None);
    assert_eq!(engine.classify(&phone, Axis::Mute), None);
}

#[test]
fn test_malformed_rule_never_matches() {
    let engine = desktop(Arc::new(InMemoryRoutingHost::new()));
    let broken = engine.streams().iter().find(|s| s.id == "broken_rule").unwrap();
    assert!(broken.rule.is_none());

    let stream = StreamAttributes::new("x", Direction::Output).with_property("media.role", "");
    assert_ne!(engine.matching_rule(&stream).map(|r| r.id.as_str()), Some("broken_rule"));
}

#[test]
fn test_explicit_control_respected() {
    let engine = desktop(Arc::new(InMemoryRoutingHost::new()));
    let stream = playback("event").with_explicit_control(Axis::Mute);

    assert_eq!(
        engine.classify(&stream, Axis::Volume),
        Some(BindingTarget::audio_group("notifications", Axis::Volume))
    );
    assert_eq!(engine.classify(&stream, Axis::Mute), None);
}

#[test]
fn test_classification_is_repeatable() {
    let engine = desktop(Arc::new(InMemoryRoutingHost::new()));
    let stream = playback("music");

    let first = engine.on_stream_initial_control(Axis::Volume, &stream);
    for _ in 0..10 {
        assert_eq!(engine.on_stream_initial_control(Axis::Volume, &stream), first);
    }
}

#[test]
fn test_negation_policies() {
    let text = "\
[General]
audio-groups = quiet
streams = not_music

[AudioGroup quiet]
volume-control = create

[Stream not_music]
match = (NEG property media.role=music)
audio-group-for-volume = quiet
";
    let ignore = ConfigLoader::load_str("t", text)
        .unwrap()
        .finalize(Arc::new(InMemoryRoutingHost::new()), NegationPolicy::Ignore);
    let apply = ConfigLoader::load_str("t", text)
        .unwrap()
        .finalize(Arc::new(InMemoryRoutingHost::new()), NegationPolicy::Apply);

    let music = playback("music");
    let event = playback("event");

    assert!(ignore.classify(&music, Axis::Volume).is_some());
    assert!(ignore.classify(&event, Axis::Volume).is_none());

    assert!(apply.classify(&music, Axis::Volume).is_none());
    assert!(apply.classify(&event, Axis::Volume).is_some());
}

#[test]
fn test_rule_compile_errors() {
    assert_eq!(compile(""), Err(ParseError::Empty));
    assert!(matches!(
        compile("((direction input OR direction output) AND property a=b)"),
        Err(ParseError::NotDisjunctiveNormalForm(_))
    ));
    assert!(matches!(compile("(direction input"), Err(ParseError::UnbalancedParentheses(_))));
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_teardown_then_classify() {
    let host = Arc::new(InMemoryRoutingHost::new());
    let mut engine = desktop(host.clone());

    engine.teardown();
    assert!(host.group_ids().is_empty());
    assert_eq!(host.destroyed_count(), 3);

    let stream = StreamAttributes::new("paplay", Direction::Output)
        .with_property("application.process.binary", "paplay");
    assert_eq!(engine.classify(&stream, Axis::Volume), None);

    engine.teardown();
    drop(engine);
    assert_eq!(host.destroyed_count(), 3);
}

#[tokio::test]
async fn test_shared_engine_reload_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio-groups.conf");
    tokio::fs::write(&path, DESKTOP).await.unwrap();

    let host = Arc::new(InMemoryRoutingHost::new());
    let shared = SharedEngine::new(host.clone(), NegationPolicy::Ignore);
    let source = FileSource::new(&path);

    shared.reload(&source).await.unwrap();
    assert_eq!(host.group_ids().len(), 3);

    tokio::fs::write(&path, "[General]\naudio-groups = media\n").await.unwrap();
    shared.reload(&source).await.unwrap();

    assert_eq!(host.group_ids(), vec!["media"]);
    assert_eq!(shared.on_stream_initial_control(Axis::Volume, &playback("music")), None);

    shared.teardown();
    assert!(host.group_ids().is_empty());
}

#[test]
fn test_reload_after_teardown_is_identical() {
    let host = Arc::new(InMemoryRoutingHost::new());
    let streams = [
        playback("music"),
        playback("event"),
        playback("phone"),
        StreamAttributes::new("mic", Direction::Input),
    ];

    let mut first = desktop(host.clone());
    let order: Vec<String> = first.streams().iter().map(|s| s.id.clone()).collect();
    let decisions: Vec<_> = streams
        .iter()
        .flat_map(|s| Axis::ALL.map(|axis| first.classify(s, axis)))
        .collect();
    first.teardown();

    let second = desktop(host.clone());
    let reloaded: Vec<String> = second.streams().iter().map(|s| s.id.clone()).collect();
    assert_eq!(reloaded, order);

    let again: Vec<_> = streams
        .iter()
        .flat_map(|s| Axis::ALL.map(|axis| second.classify(s, axis)))
        .collect();
    assert_eq!(again, decisions);
}
