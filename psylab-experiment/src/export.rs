use std::io::{self, Write};

/// Destination for a header row followed by data rows.
pub trait TableSink {
    fn write_header(&mut self, header: &[&str]) -> io::Result<()>;
    /// `None` cells are written blank.
    fn write_row(&mut self, cells: &[Option<f64>]) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()>;
}

/// Comma separated, CRLF terminated rows.
///
/// Values are written with their shortest round-trip representation, so
/// exporting the same log twice is byte-identical.
pub struct CsvSink<W: Write> {
    out: W,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TableSink for CsvSink<W> {
    fn write_header(&mut self, header: &[&str]) -> io::Result<()> {
        self.out.write_all(header.join(",").as_bytes())?;
        self.out.write_all(b"\r\n")
    }

    fn write_row(&mut self, cells: &[Option<f64>]) -> io::Result<()> {
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                self.out.write_all(b",")?;
            }
            if let Some(value) = cell {
                write!(self.out, "{value:?}")?;
            }
        }
        self.out.write_all(b"\r\n")
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
