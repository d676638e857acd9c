use crate::Writer;
use kgx_model::{Record, Result};

/// Accumulates every written record in memory rather than serializing it.
/// Used when one transform's output feeds another as a mapping table, so
/// there is never a file on disk in between.
#[derive(Default)]
pub struct PassthroughWriter {
    records: Vec<Record>,
}

impl PassthroughWriter {
    pub fn new() -> PassthroughWriter {
        PassthroughWriter::default()
    }

    /// Consumes the writer, returning every record it accumulated in the
    /// order they were written.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl Writer for PassthroughWriter {
    fn write_record(&mut self, record: Record) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_records_in_write_order() {
        let mut writer = PassthroughWriter::new();
        let mut a = Record::new();
        a.insert("id", "A");
        let mut b = Record::new();
        b.insert("id", "B");
        writer.write_record(a).unwrap();
        writer.write_record(b).unwrap();

        let records = writer.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("id").unwrap().as_str(), Some("A"));
    }
}
