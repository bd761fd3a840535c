//! Line-oriented prediction output.
//!
//! One line per grid point:
//!
//! ```text
//! Aromatic:Hydrophobic,12.5,-3.0,7.25,ligands/1abc_lig.sdf,proteins/1abc_rec.pdb
//! ```
//!
//! Labels are joined with `:` in vocabulary order and the field is empty when
//! no label is active. Coordinates keep their full precision.

use crate::error::Result;
use crate::types::{Complex, LabeledPoint};
use std::io::Write;

/// Format a coordinate the way it is written to the tabular file:
/// shortest round-trip form, with `.0` kept on integral values.
#[must_use]
pub fn format_coordinate(value: f32) -> String {
    format!("{value:?}")
}

/// Streams labeled points to a writer.
#[derive(Debug)]
pub struct TabularWriter<W: Write> {
    writer: W,
    lines: usize,
}

impl<W: Write> TabularWriter<W> {
    /// Wrap `writer`. Callers should pass a buffered writer for files.
    pub const fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Append one line.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the underlying writer fails.
    pub fn write_point(&mut self, point: &LabeledPoint<'_>) -> Result<()> {
        let [x, y, z] = point.center;
        let Complex { ligand, protein } = point.complex;
        writeln!(
            self.writer,
            "{},{},{},{},{ligand},{protein}",
            point.labels.join(":"),
            format_coordinate(x),
            format_coordinate(y),
            format_coordinate(z),
        )?;
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written so far.
    #[must_use]
    pub const fn lines(&self) -> usize {
        self.lines
    }

    /// Flush and return the inner writer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if flushing fails.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
