//! Grid data sources.
//!
//! A [`GridSource`] enumerates the complexes of one dataset split and streams
//! the grid samples of each complex in a fixed order. Grid generation itself
//! happens upstream; [`NpyGridSource`] reads its precomputed output.

use crate::error::{Error, Result};
use crate::types::{Complex, GridSample};
use memmap2::Mmap;
use ndarray::{Array2, ArrayViewD, Axis};
use ndarray_npy::ViewNpyExt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Ordered sample stream of one complex.
pub type SampleStream<'a> = Box<dyn Iterator<Item = Result<GridSample>> + 'a>;

/// Supplies complexes and their grid samples.
pub trait GridSource {
    /// Complexes in processing order.
    fn complexes(&self) -> &[Complex];

    /// Samples of `complex`, in the order they should be written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataSource`] if the complex's data can't be opened.
    /// Errors while streaming are yielded as items.
    fn samples<'a>(&'a self, complex: &Complex) -> Result<SampleStream<'a>>;
}

/// Parse a complex listing: one `ligand protein` or `ligand,protein` pair per
/// line. Blank lines and `#` comments are skipped; extra columns are ignored.
///
/// # Errors
///
/// Returns [`Error::DataSource`] if the file can't be read or a line has
/// fewer than two fields.
pub fn read_complex_list(path: impl AsRef<Path>) -> Result<Vec<Complex>> {
    let path = path.as_ref();
    let data_error = |reason: String| Error::DataSource {
        path: path.display().to_string(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| data_error(e.to_string()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let mut complexes = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| data_error(e.to_string()))?;
        let fields: Vec<&str> = record
            .iter()
            .flat_map(str::split_whitespace)
            .collect();
        match fields.as_slice() {
            [] => {}
            [ligand, protein, ..] => complexes.push(Complex::new(*ligand, *protein)),
            [only] => {
                let line = record.position().map_or(0, csv::Position::line);
                return Err(data_error(format!(
                    "line {line}: expected ligand and protein, got '{only}'"
                )));
            }
        }
    }

    Ok(complexes)
}

/// Derive the test listing from a train listing by replacing every `train`
/// in the path with `test`.
#[must_use]
pub fn test_listing_for(train_listing: &Path) -> PathBuf {
    PathBuf::from(train_listing.to_string_lossy().replace("train", "test"))
}

/// Precomputed grids stored as NumPy arrays next to each ligand.
///
/// For a ligand `site/lig.sdf` the source reads
/// - `<root>/site/lig.centers.npy`, `f32` of shape `(n, 3)`
/// - `<root>/site/lig.grids.npy`, `f32` of shape `(n, *grid_shape)`
#[derive(Debug, Clone)]
pub struct NpyGridSource {
    root: PathBuf,
    complexes: Vec<Complex>,
}

impl NpyGridSource {
    /// Open the split listed in `listing`, resolving array files under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataSource`] if the listing can't be parsed.
    pub fn open(listing: impl AsRef<Path>, root: impl Into<PathBuf>) -> Result<Self> {
        let complexes = read_complex_list(listing)?;
        Ok(Self::new(root, complexes))
    }

    /// Build a source from an explicit complex list.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, complexes: Vec<Complex>) -> Self {
        Self {
            root: root.into(),
            complexes,
        }
    }

    /// Paths of the centers and grids arrays of `complex`.
    #[must_use]
    pub fn array_paths(&self, complex: &Complex) -> (PathBuf, PathBuf) {
        let base = self.root.join(&complex.ligand);
        (
            base.with_extension("centers.npy"),
            base.with_extension("grids.npy"),
        )
    }
}

fn npy_error(path: &Path, reason: impl ToString) -> Error {
    Error::DataSource {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// A read-only memory map of a `.npy` grid array.
///
/// Pages are only touched when a sample is copied out, so a complex never
/// holds more than one decoded grid at a time.
struct MappedGrids {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedGrids {
    #[allow(unsafe_code)]
    fn open(path: PathBuf) -> Result<Self> {
        let file = File::open(&path).map_err(|e| npy_error(&path, e))?;
        // SAFETY: the map is read-only and the array file must not be
        // truncated while a complex is being processed.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| npy_error(&path, e))?;
        Ok(Self { mmap, path })
    }

    /// View of the whole `(n, *grid_shape)` array, without copying.
    fn view(&self) -> Result<ArrayViewD<'_, f32>> {
        ArrayViewD::<f32>::view_npy(&self.mmap).map_err(|e| npy_error(&self.path, e))
    }
}

/// Lazily yields samples, copying one grid out of the map per item.
struct NpySamples {
    centers: Array2<f32>,
    grids: MappedGrids,
    next: usize,
}

impl Iterator for NpySamples {
    type Item = Result<GridSample>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        if index >= self.centers.nrows() {
            return None;
        }
        self.next += 1;

        let c = self.centers.row(index);
        let center = [c[0], c[1], c[2]];
        Some(
            self.grids
                .view()
                .map(|grids| GridSample::new(center, grids.index_axis(Axis(0), index).to_owned())),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.centers.nrows() - self.next;
        (remaining, Some(remaining))
    }
}

impl GridSource for NpyGridSource {
    fn complexes(&self) -> &[Complex] {
        &self.complexes
    }

    fn samples<'a>(&'a self, complex: &Complex) -> Result<SampleStream<'a>> {
        let (centers_path, grids_path) = self.array_paths(complex);

        let centers: Array2<f32> =
            ndarray_npy::read_npy(&centers_path).map_err(|e| npy_error(&centers_path, e))?;
        if centers.ncols() != 3 {
            return Err(npy_error(
                &centers_path,
                format!("expected (n, 3) centers, got {:?}", centers.shape()),
            ));
        }

        let grids = MappedGrids::open(grids_path)?;
        let grid_shape = grids.view()?.shape().to_vec();
        if grid_shape.first() != Some(&centers.nrows()) {
            return Err(npy_error(
                &grids.path,
                format!(
                    "{} centers but grids have shape {grid_shape:?}",
                    centers.nrows()
                ),
            ));
        }

        log::debug!(
            "{}: {} samples of shape {:?}",
            complex.ligand,
            centers.nrows(),
            &grid_shape[1..]
        );

        Ok(Box::new(NpySamples {
            centers,
            grids,
            next: 0,
        }))
    }
}
