//! The user transform contract. The user-authored body is out of scope —
//! it lives behind these traits in an embedding crate or test fixture —
//! but the entry-point shape and the "exactly one" registration rule are
//! specified here.

use crate::context::TransformContext;
use kgx_model::{Error, Record, Result};

/// A signal a transform entry point can return in place of success: either
/// a hard failure, or the "skip this row and keep going" control flow that
/// the runtime catches at the per-record boundary.
#[derive(Debug)]
pub enum TransformSignal {
    NextRow,
    Failed(Error),
}

impl From<Error> for TransformSignal {
    fn from(err: Error) -> Self {
        TransformSignal::Failed(err)
    }
}

pub type TransformOutcome = std::result::Result<(), TransformSignal>;

/// A lazy record stream, as handed to a [`SingleTransform`]'s entry point.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

/// A transform invoked once per source row.
pub trait PerRecordTransform {
    fn transform_record(&mut self, ctx: &mut TransformContext, record: Record) -> TransformOutcome;

    fn on_data_begin(&mut self, _ctx: &mut TransformContext) -> Result<()> {
        Ok(())
    }

    fn on_data_end(&mut self, _ctx: &mut TransformContext) -> Result<()> {
        Ok(())
    }
}

/// A transform invoked once per run, driving the record stream itself.
pub trait SingleTransform {
    fn transform(&mut self, ctx: &mut TransformContext, rows: RecordStream<'_>) -> TransformOutcome;

    fn on_data_begin(&mut self, _ctx: &mut TransformContext) -> Result<()> {
        Ok(())
    }

    fn on_data_end(&mut self, _ctx: &mut TransformContext) -> Result<()> {
        Ok(())
    }
}

/// The resolved entry point a transform module declared. Constructed by
/// [`TransformRegistration::resolve`], never directly.
pub enum TransformEntryPoint {
    PerRecord(Box<dyn PerRecordTransform>),
    Single(Box<dyn SingleTransform>),
}

/// What a transform module registers at load time. Exactly one of
/// `per_record`/`single` must be set; declaring both or neither is a
/// `CONTRACT` error, raised when [`resolve`](Self::resolve) is called.
#[derive(Default)]
pub struct TransformRegistration {
    pub per_record: Option<Box<dyn PerRecordTransform>>,
    pub single: Option<Box<dyn SingleTransform>>,
}

impl TransformRegistration {
    pub fn per_record(transform: impl PerRecordTransform + 'static) -> TransformRegistration {
        TransformRegistration {
            per_record: Some(Box::new(transform)),
            single: None,
        }
    }

    pub fn single(transform: impl SingleTransform + 'static) -> TransformRegistration {
        TransformRegistration {
            per_record: None,
            single: Some(Box::new(transform)),
        }
    }

    pub fn resolve(self) -> Result<TransformEntryPoint> {
        match (self.per_record, self.single) {
            (Some(_), Some(_)) => Err(Error::contract(
                "transform module declares both transform_record and transform entry points",
            )),
            (Some(per_record), None) => Ok(TransformEntryPoint::PerRecord(per_record)),
            (None, Some(single)) => Ok(TransformEntryPoint::Single(single)),
            (None, None) => Err(Error::contract(
                "transform module declares neither a transform_record nor a transform entry point",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl PerRecordTransform for Noop {
        fn transform_record(&mut self, _ctx: &mut TransformContext, _record: Record) -> TransformOutcome {
            Ok(())
        }
    }

    #[test]
    fn declaring_both_entry_points_is_a_contract_error() {
        let mut registration = TransformRegistration::per_record(Noop);
        registration.single = Some(Box::new(NoopSingle));
        let err = registration.resolve().unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Contract);
    }

    #[test]
    fn declaring_neither_entry_point_is_a_contract_error() {
        let err = TransformRegistration::default().resolve().unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Contract);
    }

    struct NoopSingle;
    impl SingleTransform for NoopSingle {
        fn transform(&mut self, _ctx: &mut TransformContext, _rows: RecordStream<'_>) -> TransformOutcome {
            Ok(())
        }
    }
}
