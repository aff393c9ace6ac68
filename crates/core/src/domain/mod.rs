//! Domain entities and business rules

pub mod classifier;
pub mod config;
pub mod group;
pub mod host;
pub mod rule;
pub mod settings;
pub mod source;
pub mod stream;

// Re-export specific items to avoid ambiguous `Result` aliases
pub use classifier::{AudioGroupsEngine, EngineSnapshot};
pub use config::{scan, ConfigError, ConfigItem, ConfigLoader, ResolvedBinding, StreamRule};
pub use group::{ActiveGroup, AudioGroupDefinition, BindingTarget, ControlAction, AUDIO_GROUP_TARGET_TYPE};
pub use host::{GroupControl, GroupHandle, HostError, InitialControlHook, RoutingHost};
pub use rule::{compile, Conjunction, Expression, Literal, NegationPolicy, ParseError, Predicate};
pub use settings::{ConfigWatcher, EngineSettings, SETTINGS_FILE};
pub use source::{ConfigSource, FileSource, InlineSource, CONFIG_DIR_NAME, DEFAULT_CONFIG_FILE};
pub use stream::{Axis, Direction, StreamAttributes};
