//! Example demonstrating configuration loading and stream classification
//!
//! Run with: cargo run --package audiogroups-core --example classify_demo

use std::sync::Arc;
use audiogroups_core::domain::{
    Axis, ConfigLoader, Direction, InlineSource, NegationPolicy, StreamAttributes,
};
use audiogroups_infra::routing::InMemoryRoutingHost;

const CONFIG: &str = "\
[General]
audio-groups = media system
streams = paplay_stream music any_stream

[AudioGroup media]
description = Media
volume-control = create
mute-control = bind:AudioGroup:system

[AudioGroup system]
mute-control = create

[Stream paplay_stream]
match = (property application.process.binary=paplay)
audio-group-for-volume = media

[Stream music]
match = (property media.role=music AND direction output)
audio-group-for-volume = media
audio-group-for-mute = system

[Stream any_stream]
match = (direction input OR direction output)
audio-group-for-mute = system
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("audiogroups_core=debug,info")
        .init();

    println!("=== Audio Groups Classification Demo ===\n");

    println!("1. Loading configuration...");
    let loader = ConfigLoader::load(&InlineSource::new("demo", CONFIG)).await?;
    println!(
        "   ✓ {} groups, {} streams declared",
        loader.declared_groups().len(),
        loader.declared_streams().len()
    );

    println!("\n2. Creating groups on the host...");
    let host = Arc::new(InMemoryRoutingHost::new());
    let mut engine = loader.finalize(host.clone(), NegationPolicy::Ignore);
    println!("   ✓ Host groups: {}", host.group_ids().join(", "));

    println!("\n3. Stream rules in match order:");
    for (i, stream) in engine.streams().iter().enumerate() {
        if let Some(rule) = &stream.rule {
            println!("   {}. {}: {}", i + 1, stream.id, rule);
        }
    }

    println!("\n4. Classifying streams:");
    let streams = [
        StreamAttributes::new("paplay", Direction::Output)
            .with_property("application.process.binary", "paplay"),
        StreamAttributes::new("spotify", Direction::Output).with_property("media.role", "music"),
        StreamAttributes::new("mic", Direction::Input),
    ];
    for stream in &streams {
        for axis in Axis::ALL {
            match engine.classify(stream, axis) {
                Some(target) => println!("   {} {} -> {}", stream.name, axis, target),
                None => println!("   {} {} -> default", stream.name, axis),
            }
        }
    }

    println!("\n5. Tearing down...");
    engine.teardown();
    println!("   ✓ {} groups destroyed", host.destroyed_count());

    Ok(())
}
