//! Format-specific lazy record readers. Every reader honors `row_limit`
//! (0 = unbounded) and exposes the last row number it produced, so the
//! caller can attach row context to a failure.

mod delimited;
mod jsonl;
pub mod structured;

pub use delimited::DelimitedReader;
pub use jsonl::JsonlReader;
pub use structured::StructuredReader;

use kgx_model::Record;

/// A lazily-pulled sequence of records that also remembers how far it got.
pub trait RecordReader: Iterator<Item = kgx_model::Result<Record>> {
    fn last_row(&self) -> u64;
}
