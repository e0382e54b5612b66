pub mod config;
pub mod id;
pub mod layout;
pub mod mapping;
pub mod model;
pub mod normalize;
pub mod shorthand;
pub mod snapshot;
pub mod transform;

pub use config::EngineConfig;
pub use id::LayerId;
pub use layout::{Placed, ROW_TOLERANCE, reading_order};
pub use mapping::{FieldToLayer, Mapping, MappingRow, PairKind, Window, rows_to_pairs};
pub use model::*;
pub use normalize::{Hit, NormalizedItem, normalize, normalize_all};
pub use shorthand::{PairShorthand, parse_pair};
pub use snapshot::{DocumentSnapshot, LayerSnapshot};
pub use transform::{Transform, apply_transform};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
