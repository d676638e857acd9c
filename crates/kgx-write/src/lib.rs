//! KGX artifact writers: the `G` component. Every writer dispatches a
//! record to a node or edge sink by inspecting its shape (`id` alone vs.
//! the `subject`/`predicate`/`object` triple), and all three share the
//! same open signature so a transform runtime can swap formats without
//! otherwise changing.

mod jsonl;
mod passthrough;
pub mod sssom;
mod tsv;

pub use jsonl::JsonlWriter;
pub use passthrough::PassthroughWriter;
pub use sssom::SssomRewriter;
pub use tsv::TsvWriter;

use kgx_model::Record;

/// Common surface every writer implementation exposes. `finalize` is called
/// exactly once by the transform runtime after the source iteration ends,
/// regardless of whether it ended normally, by `row_limit`, or by error.
pub trait Writer {
    fn write_record(&mut self, record: Record) -> kgx_model::Result<()>;
    fn finalize(&mut self) -> kgx_model::Result<()>;
}
