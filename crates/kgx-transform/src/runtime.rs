//! Drives a transform entry point over a [`Source`], enforces the
//! "`finalize` called exactly once" and "`NextRow` caught only at the
//! per-record boundary" guarantees, and caches loaded transform modules
//! by absolute path for the lifetime of one run.

use crate::context::TransformContext;
use crate::mapping::Mappings;
use crate::transform::{RecordStream, TransformEntryPoint, TransformRegistration, TransformSignal};
use kgx_config::OnMapFailure;
use kgx_ingest::Source;
use kgx_model::{Error, Result};
use kgx_write::Writer;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// The out-of-scope half of the contract: given the absolute path a
/// transform config names, produce its registration. An embedder supplies
/// this (e.g. backed by a compiled plugin registry or a test fixture); this
/// crate only specifies the caching behavior around it.
pub trait TransformLoader {
    fn load(&self, absolute_path: &Path) -> Result<TransformRegistration>;
}

/// Loads each distinct absolute path at most once per `ModuleCache`
/// instance. Constructing a fresh `ModuleCache` per run (never reusing one
/// across runs) is what prevents two runs whose configs happen to name a
/// module with the same bare filename from cross-contaminating state —
/// the cache key is the resolved absolute path, not the name.
pub struct ModuleCache<'l> {
    loader: &'l dyn TransformLoader,
    cache: RefCell<HashMap<PathBuf, Rc<RefCell<TransformEntryPoint>>>>,
}

impl<'l> ModuleCache<'l> {
    pub fn new(loader: &'l dyn TransformLoader) -> ModuleCache<'l> {
        ModuleCache {
            loader,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn get_or_load(&self, absolute_path: &Path) -> Result<Rc<RefCell<TransformEntryPoint>>> {
        if let Some(existing) = self.cache.borrow().get(absolute_path) {
            return Ok(existing.clone());
        }
        let registration = self.loader.load(absolute_path)?;
        let entry = registration.resolve()?;
        let handle = Rc::new(RefCell::new(entry));
        self.cache.borrow_mut().insert(absolute_path.to_path_buf(), handle.clone());
        Ok(handle)
    }
}

/// Runs `entry` over every record `source` yields, honoring the row-limit
/// and error-termination points the source already enforces, and calling
/// the writer's `finalize` exactly once no matter how iteration ends.
pub fn run(
    entry: &mut TransformEntryPoint,
    source: Source,
    writer: &mut dyn Writer,
    mappings: &Mappings,
    on_map_failure: OnMapFailure,
) -> Result<()> {
    let mut ctx = TransformContext::new(writer, mappings, on_map_failure);

    let run_result: Result<()> = match entry {
        TransformEntryPoint::PerRecord(transform) => {
            let mut result = transform.on_data_begin(&mut ctx);
            if result.is_ok() {
                result = run_per_record(transform.as_mut(), &mut ctx, source);
            }
            let end_result = transform.on_data_end(&mut ctx);
            result.and(end_result)
        }
        TransformEntryPoint::Single(transform) => {
            let mut result = transform.on_data_begin(&mut ctx);
            if result.is_ok() {
                let rows: RecordStream<'_> = Box::new(source);
                result = match transform.transform(&mut ctx, rows) {
                    Ok(()) => Ok(()),
                    Err(TransformSignal::NextRow) => {
                        Err(Error::contract("NextRow is only meaningful from a per-record transform"))
                    }
                    Err(TransformSignal::Failed(e)) => Err(e),
                };
            }
            let end_result = transform.on_data_end(&mut ctx);
            result.and(end_result)
        }
    };

    let finalize_result = ctx.finalize_writer();
    run_result.and(finalize_result)
}

fn run_per_record(
    transform: &mut dyn crate::transform::PerRecordTransform,
    ctx: &mut TransformContext,
    source: Source,
) -> Result<()> {
    for record in source {
        let record = record?;
        match transform.transform_record(ctx, record) {
            Ok(()) => {}
            Err(TransformSignal::NextRow) => continue,
            Err(TransformSignal::Failed(e)) => return Err(e),
        }
    }
    Ok(())
}
