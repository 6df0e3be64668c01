//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use common::files::read_csv_as_labels;
use common::files::read_csv_as_matrix;
use common::files::FileError;

#[test]
fn test_read_csv_as_matrix() {
    let m = read_csv_as_matrix("./tests/features.csv", false).unwrap();
    assert_eq!(m.shape(), &[4, 3]);
    assert_eq!(m.row(0).to_vec(), vec![0.5, 1.0, 0.0]);
    assert_eq!(m.row(3).to_vec(), vec![0.0, 0.0, 0.0]);
    assert_eq!(m.column(0).to_vec(), vec![0.5, 0.25, 1.0, 0.0]);
}

#[test]
fn test_read_csv_as_labels() {
    let y = read_csv_as_labels("./tests/labels.csv", false).unwrap();
    assert_eq!(y.to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
}

#[test]
fn test_features_are_not_labels() {
    let r = read_csv_as_labels("./tests/features.csv", false);
    assert!(matches!(r, Err(FileError::NotAColumn { cols: 3, .. })));
}

#[test]
fn test_missing_file() {
    let r = read_csv_as_matrix("./tests/nope.csv", false);
    assert!(matches!(r, Err(FileError::Missing(_))));
}
