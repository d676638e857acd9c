//! Graph-level operations over an embedded analytic database: combining
//! files into a unified graph, deduplicating, normalizing identifiers
//! through SSSOM mappings, pruning integrity issues, widening an existing
//! graph with new files, and splitting one file into many.

mod append;
mod deduplicate;
mod join;
mod normalize;
mod prune;
mod split;

pub use append::{append_graphs, AppendConfig, AppendResult};
pub use deduplicate::{deduplicate_graph, DedupeCounts, DeduplicateConfig, DeduplicateResult};
pub use join::{join_graphs, JoinConfig, JoinResult};
pub use normalize::{normalize_graph, NormalizeConfig, NormalizeResult};
pub use prune::{prune_graph, PruneConfig, PruneResult, SingletonPolicy};
pub use split::{split_graph, SplitConfig, SplitResult};
