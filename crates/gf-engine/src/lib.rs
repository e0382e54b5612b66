pub mod discovery;
pub mod host;
pub mod item;
pub mod lint;
pub mod memory;
pub mod messages;
pub mod plugin;
pub mod populate;
pub mod resolver;
pub mod store;

pub use discovery::target_cards;
pub use host::{ClientStorage, DocumentHost, HostError, ImageFetcher, LayerSummary, UiChannel};
pub use lint::{LintSeverity, PairDiagnostic, lint_pairs};
pub use memory::{FileStorage, MemoryHost, MemoryImages, MemoryStorage, RecordingChannel};
pub use messages::{PluginEvent, UiMessage};
pub use plugin::Plugin;
pub use populate::{BatchReport, Populator, Task};
pub use resolver::{LayerInfo, MappedNodes, Resolution, introspect_selection};
pub use store::{MappingStore, StoreError};
