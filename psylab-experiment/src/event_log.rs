use crate::export::{CsvSink, TableSink};
use psylab_core::{EventKind, PsylabError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One aligned row of the exported table, one cell per [`EventKind`].
pub type Row = [Option<f64>; EventKind::COUNT];

/// Append-only timestamps per event kind.
///
/// Insertion order is kept as-is; every timestamp comes from the same global
/// clock so insertion order within a kind is chronological.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    columns: [Vec<f64>; EventKind::COUNT],
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: EventKind, timestamp: f64) {
        self.columns[kind.index()].push(timestamp);
    }

    pub fn get(&self, kind: EventKind) -> &[f64] {
        &self.columns[kind.index()]
    }

    pub fn len(&self, kind: EventKind) -> usize {
        self.columns[kind.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Vec::is_empty)
    }

    /// Length of the longest column, i.e. the number of exported data rows.
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Columns aligned row-wise; shorter columns leave `None` gaps.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.row_count())
            .map(move |i| std::array::from_fn(|k| self.columns[k].get(i).copied()))
    }

    /// Writes the header row and every aligned data row into `sink`.
    pub fn export<S: TableSink + ?Sized>(&self, sink: &mut S) -> std::io::Result<()> {
        sink.write_header(&EventKind::headers())?;
        for row in self.rows() {
            sink.write_row(&row)?;
        }
        sink.finish()
    }

    pub fn write_csv<W: Write>(&self, out: W) -> std::io::Result<()> {
        self.export(&mut CsvSink::new(out))
    }

    /// Creates (or truncates) `path` and writes the CSV table into it.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(PsylabError::Export)?;
        self.write_csv(BufWriter::new(file)).map_err(PsylabError::Export)
    }
}
