//! End-to-end tests over `.npy` grid data on disk.
//!
//! The model is a deterministic stand-in, so these tests need no fixtures.

#![allow(clippy::unwrap_used)] // Tests can use unwrap
#![allow(clippy::cast_precision_loss)] // Index casts are fine
#![allow(clippy::float_cmp)]

use ndarray::{Array2, ArrayD, ArrayViewD, IxDyn};
use pharmnn_onnx::{
    Error, GridSource, InferencePipeline, LabelVocabulary, Model, NpyGridSource, PipelineConfig,
    Result, test_listing_for,
};
use std::path::Path;

const GRID_SHAPE: [usize; 4] = [1, 2, 2, 2];

/// Grids with a positive sum activate the first label, all others the second.
struct StepModel {
    grid_shape: Vec<usize>,
    calls: usize,
}

impl StepModel {
    fn new() -> Self {
        Self {
            grid_shape: GRID_SHAPE.to_vec(),
            calls: 0,
        }
    }
}

impl Model for StepModel {
    fn grid_shape(&self) -> &[usize] {
        &self.grid_shape
    }

    fn num_labels(&self) -> usize {
        2
    }

    fn forward(&mut self, grids: ArrayViewD<'_, f32>) -> Result<Array2<f32>> {
        self.calls += 1;
        let mut logits = Array2::zeros((grids.shape()[0], 2));
        for (row, grid) in grids.outer_iter().enumerate() {
            let on = if grid.sum() > 0.0 { 3.0 } else { -3.0 };
            logits[[row, 0]] = on;
            logits[[row, 1]] = -on;
        }
        Ok(logits)
    }
}

/// 2x2x2 lattice at spacing 0.5 in z-fastest order; even samples are "on".
fn write_complex(root: &Path, site: &str, origin: [f32; 3]) {
    let mut centers = Vec::new();
    for i in 0..2 {
        for j in 0..2 {
            for k in 0..2 {
                centers.extend([
                    (i as f32).mul_add(0.5, origin[0]),
                    (j as f32).mul_add(0.5, origin[1]),
                    (k as f32).mul_add(0.5, origin[2]),
                ]);
            }
        }
    }
    let centers = Array2::from_shape_vec((8, 3), centers).unwrap();

    let mut shape = vec![8];
    shape.extend(GRID_SHAPE);
    let grids = ArrayD::<f32>::from_shape_fn(IxDyn(&shape), |idx| {
        if idx[0] % 2 == 0 { 1.0 } else { 0.0 }
    });

    std::fs::create_dir_all(root.join(site)).unwrap();
    ndarray_npy::write_npy(root.join(site).join("lig.centers.npy"), &centers).unwrap();
    ndarray_npy::write_npy(root.join(site).join("lig.grids.npy"), &grids).unwrap();
}

/// Data root with `data_train.txt` (site1) and `data_test.txt` (site2).
fn dataset() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_complex(dir.path(), "site1", [1.0, 2.0, 3.0]);
    write_complex(dir.path(), "site2", [-1.0, 0.0, 0.5]);
    std::fs::write(
        dir.path().join("data_train.txt"),
        "site1/lig.sdf site1/rec.pdb\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("data_test.txt"),
        "site2/lig.sdf,site2/rec.pdb\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("labels.txt"), "Donor\nAcceptor\n").unwrap();
    dir
}

fn sources(root: &Path) -> (NpyGridSource, NpyGridSource) {
    let train_listing = root.join("data_train.txt");
    let test_listing = test_listing_for(&train_listing);
    (
        NpyGridSource::open(&train_listing, root).unwrap(),
        NpyGridSource::open(&test_listing, root).unwrap(),
    )
}

#[test]
fn test_tabular_output_for_both_splits() {
    let data = dataset();
    let root = data.path();
    let (train, test) = sources(root);
    assert_eq!(train.complexes().len(), 1);

    let config = PipelineConfig::new()
        .with_batch_size(3)
        .with_output_base_path(root.join("preds"))
        .with_label_file(root.join("labels.txt"));
    let vocabulary = config.vocabulary().unwrap();
    let mut pipeline = InferencePipeline::new(StepModel::new(), vocabulary, config).unwrap();

    let (train_summary, test_summary) = pipeline.run(&train, &test).unwrap();
    assert_eq!(train_summary.samples, 8);
    assert_eq!(train_summary.batches, 3);
    assert_eq!(test_summary.samples, 8);
    assert_eq!(pipeline.model().calls, 6);

    let train_text = std::fs::read_to_string(root.join("preds_train.txt")).unwrap();
    let lines: Vec<&str> = train_text.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[0], "Donor,1.0,2.0,3.0,site1/lig.sdf,site1/rec.pdb");
    assert_eq!(lines[1], "Acceptor,1.0,2.0,3.5,site1/lig.sdf,site1/rec.pdb");
    assert_eq!(lines[7], "Acceptor,1.5,2.5,3.5,site1/lig.sdf,site1/rec.pdb");

    let test_text = std::fs::read_to_string(root.join("preds_test.txt")).unwrap();
    assert!(test_text.starts_with("Donor,-1.0,0.0,0.5,site2/lig.sdf,site2/rec.pdb\n"));
    assert!(!root.join("site1/_Donor.dx").exists());
}

#[test]
fn test_volume_output_rounded() {
    let data = dataset();
    let root = data.path();
    let (train, test) = sources(root);

    let config = PipelineConfig::new()
        .with_output_base_path(root.join("preds"))
        .with_volume_output(true)
        .with_rounded_volume_values(true)
        .with_volume_filename_prefix("pharm")
        .with_volume_root(root)
        .with_labels(vec!["Donor".to_string(), "Acceptor".to_string()]);
    let vocabulary = config.vocabulary().unwrap();
    let mut pipeline = InferencePipeline::new(StepModel::new(), vocabulary, config).unwrap();

    let (train_summary, test_summary) = pipeline.run(&train, &test).unwrap();
    assert_eq!(train_summary.volume_files, 2);
    assert_eq!(test_summary.volume_files, 2);

    let donor = std::fs::read_to_string(root.join("site1/pharm_Donor.dx")).unwrap();
    assert_eq!(
        donor,
        "object 1 class gridpositions counts 2 2 2\n\
         origin 1.00000 2.00000 3.00000\n\
         delta 0.5 0 0\n\
         delta 0 0.5 0\n\
         delta 0 0 0.5\n\
         object 2 class gridconnections counts 2 2 2\n\
         object 3 class array type double rank 0 items [ 8] data follows\n\
         1.00000 0.00000 1.00000\n\
         0.00000 1.00000 0.00000\n\
         1.00000 0.00000\n"
    );

    let acceptor = std::fs::read_to_string(root.join("site2/pharm_Acceptor.dx")).unwrap();
    assert!(acceptor.contains("origin -1.00000 0.00000 0.50000\n"));
    assert!(acceptor.ends_with("0.00000 1.00000\n"));
}

#[test]
fn test_volume_output_raw_probabilities() {
    let data = dataset();
    let root = data.path();
    let (train, _) = sources(root);

    let config = PipelineConfig::new()
        .with_output_base_path(root.join("preds"))
        .with_volume_output(true)
        .with_volume_root(root)
        .with_labels(vec!["Donor".to_string(), "Acceptor".to_string()]);
    let vocabulary = config.vocabulary().unwrap();
    let mut pipeline = InferencePipeline::new(StepModel::new(), vocabulary, config).unwrap();
    pipeline.run_split("train", &train).unwrap();

    // sigmoid(3) and sigmoid(-3)
    let donor = std::fs::read_to_string(root.join("site1/_Donor.dx")).unwrap();
    assert!(donor.contains("\n0.95257 0.04743 0.95257\n"));
}

#[test]
fn test_wrong_resolution_keeps_tabular_lines() {
    let data = dataset();
    let root = data.path();
    let (train, _) = sources(root);

    let config = PipelineConfig::new()
        .with_output_base_path(root.join("preds"))
        .with_volume_output(true)
        .with_volume_root(root)
        .with_resolution(1.0)
        .with_labels(vec!["Donor".to_string(), "Acceptor".to_string()]);
    let vocabulary = config.vocabulary().unwrap();
    let mut pipeline = InferencePipeline::new(StepModel::new(), vocabulary, config).unwrap();

    let err = pipeline.run_split("train", &train).unwrap_err();
    assert!(matches!(err, Error::Geometry { .. }));
    assert!(!root.join("site1/_Donor.dx").exists());
}

#[test]
fn test_vocabulary_size_must_match_model() {
    let result = InferencePipeline::new(
        StepModel::new(),
        LabelVocabulary::pharmacophore(),
        PipelineConfig::default(),
    );
    assert!(matches!(
        result,
        Err(Error::LabelCount {
            expected: 2,
            got: 6
        })
    ));
}

#[test]
fn test_missing_grid_arrays() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("list.txt"), "absent/lig.sdf absent/rec.pdb\n").unwrap();
    let source = NpyGridSource::open(dir.path().join("list.txt"), dir.path()).unwrap();

    let config = PipelineConfig::new()
        .with_output_base_path(dir.path().join("preds"))
        .with_labels(vec!["Donor".to_string(), "Acceptor".to_string()]);
    let vocabulary = config.vocabulary().unwrap();
    let mut pipeline = InferencePipeline::new(StepModel::new(), vocabulary, config).unwrap();

    let err = pipeline.run_split("train", &source).unwrap_err();
    assert!(matches!(err, Error::DataSource { .. }));
}
