//! Heterogeneous source ingestion: the resource opener, the four format
//! readers, the row filter, and the [`Source`] that composes them into one
//! concatenated, filtered record stream per configured reader.

pub mod filter;
pub mod opener;
pub mod reader;
pub mod source;

pub use filter::RowFilter;
pub use opener::{Compression, NamedStream, Resource};
pub use reader::{DelimitedReader, JsonlReader, RecordReader, StructuredReader};
pub use source::Source;
