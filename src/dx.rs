//! OpenDX scalar field output.
//!
//! The lattice is reconstructed from the sample centers alone: the distinct
//! coordinates along each axis give the point counts, their minima give the
//! origin and the configured resolution is the spacing. Values are written in
//! the order the centers were collected, so the file is only a faithful field
//! when the data source scans the lattice in DX order (z fastest). No
//! reordering happens here.
//!
//! ```text
//! object 1 class gridpositions counts 2 2 2
//! origin 0.00000 0.00000 0.00000
//! delta 1.0 0 0
//! delta 0 1.0 0
//! delta 0 0 1.0
//! object 2 class gridconnections counts 2 2 2
//! object 3 class array type double rank 0 items [ 8] data follows
//! 0.91000 0.12000 0.55000
//! ...
//! ```

use crate::error::{Error, Result};
use crate::types::Center;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Values per data line.
const VALUES_PER_LINE: usize = 3;

/// Relative tolerance when comparing axis spacing with the resolution.
const SPACING_TOLERANCE: f64 = 1e-3;

/// Regular axis-aligned lattice recovered from sample centers.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    /// Distinct coordinates along x, y and z.
    pub counts: [usize; 3],
    /// Smallest coordinate along each axis.
    pub origin: [f32; 3],
    /// Spacing along every axis.
    pub resolution: f32,
}

impl GridGeometry {
    /// Recover the lattice spanned by `centers`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Geometry`] if there are no centers, a coordinate is
    /// not finite, the resolution is not positive, or the distinct values on
    /// some axis are not spaced exactly `resolution` apart.
    pub fn from_centers(centers: &[Center], resolution: f32) -> Result<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(Error::Geometry {
                reason: format!("resolution must be positive, got {resolution}"),
            });
        }
        if centers.is_empty() {
            return Err(Error::Geometry {
                reason: "no sample centers".to_string(),
            });
        }

        let mut counts = [0; 3];
        let mut origin = [0.0; 3];
        for axis in 0..3 {
            let coords = axis_coordinates(centers, axis)?;
            check_spacing(&coords, axis, resolution)?;
            counts[axis] = coords.len();
            origin[axis] = coords[0];
        }

        let geometry = Self {
            counts,
            origin,
            resolution,
        };
        if geometry.len() != centers.len() {
            log::warn!(
                "{} centers span a {}x{}x{} lattice of {} points",
                centers.len(),
                counts[0],
                counts[1],
                counts[2],
                geometry.len()
            );
        }
        Ok(geometry)
    }

    /// Number of lattice points, `nx * ny * nz`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.iter().product()
    }

    /// Always false for a geometry built from centers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sorted distinct coordinates along `axis`.
fn axis_coordinates(centers: &[Center], axis: usize) -> Result<Vec<f32>> {
    let mut coords: Vec<f32> = centers.iter().map(|c| c[axis]).collect();
    if let Some(bad) = coords.iter().find(|v| !v.is_finite()) {
        return Err(Error::Geometry {
            reason: format!("non-finite {} coordinate {bad}", axis_name(axis)),
        });
    }
    coords.sort_by(f32::total_cmp);
    coords.dedup();
    Ok(coords)
}

fn check_spacing(coords: &[f32], axis: usize, resolution: f32) -> Result<()> {
    let step = f64::from(resolution);
    for pair in coords.windows(2) {
        let spacing = f64::from(pair[1]) - f64::from(pair[0]);
        if (spacing - step).abs() > step * SPACING_TOLERANCE {
            return Err(Error::Geometry {
                reason: format!(
                    "{} spacing {spacing} between {} and {} differs from resolution {resolution}",
                    axis_name(axis),
                    pair[0],
                    pair[1]
                ),
            });
        }
    }
    Ok(())
}

const fn axis_name(axis: usize) -> &'static str {
    match axis {
        0 => "x",
        1 => "y",
        _ => "z",
    }
}

/// Serialize one scalar field. `values` holds one value per center, in
/// collection order.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_dx<W: Write>(writer: &mut W, geometry: &GridGeometry, values: &[f32]) -> Result<()> {
    let [nx, ny, nz] = geometry.counts;
    let [ox, oy, oz] = geometry.origin;
    let r = geometry.resolution;

    writeln!(writer, "object 1 class gridpositions counts {nx} {ny} {nz}")?;
    writeln!(writer, "origin {ox:.5} {oy:.5} {oz:.5}")?;
    writeln!(writer, "delta {r:?} 0 0")?;
    writeln!(writer, "delta 0 {r:?} 0")?;
    writeln!(writer, "delta 0 0 {r:?}")?;
    writeln!(writer, "object 2 class gridconnections counts {nx} {ny} {nz}")?;
    writeln!(
        writer,
        "object 3 class array type double rank 0 items [ {}] data follows",
        values.len()
    )?;

    for line in values.chunks(VALUES_PER_LINE) {
        let mut first = true;
        for value in line {
            if !first {
                write!(writer, " ")?;
            }
            write!(writer, "{value:.5}")?;
            first = false;
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Create `path` and write one scalar field to it. The file is closed before
/// returning, also on error.
///
/// # Errors
///
/// Returns [`Error::OutputFile`] if the file can't be created and
/// [`Error::Io`] if writing fails.
pub fn write_dx_file(path: &Path, geometry: &GridGeometry, values: &[f32]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::OutputFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut writer = BufWriter::new(file);
    write_dx(&mut writer, geometry, values)?;
    writer.flush()?;
    Ok(())
}

/// Where the field for `label` of a complex goes: next to the protein,
/// under `volume_root`, as `<prefix>_<label>.dx`.
///
/// A protein path with no directory puts the file directly in `volume_root`.
#[must_use]
pub fn volume_output_path(protein: &str, volume_root: &Path, prefix: &str, label: &str) -> PathBuf {
    let protein_dir = Path::new(protein).parent().unwrap_or_else(|| Path::new(""));
    volume_root
        .join(protein_dir)
        .join(format!("{prefix}_{label}.dx"))
}
