//! The transform runtime: the contract a user transform module implements,
//! the context object it's handed, the mapping tables it can `lookup`
//! against, and the driver that ties a [`kgx_ingest::Source`] and a
//! [`kgx_write::Writer`] together through one of them.

mod context;
mod mapping;
mod runtime;
mod transform;

pub use context::TransformContext;
pub use mapping::{load_mapping, load_mappings, KeyIndex, Mappings};
pub use runtime::{run, ModuleCache, TransformLoader};
pub use transform::{
    PerRecordTransform, RecordStream, SingleTransform, TransformEntryPoint, TransformOutcome, TransformRegistration,
    TransformSignal,
};
