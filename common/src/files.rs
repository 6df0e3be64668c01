//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

extern crate csv;

use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use ndarray::Array1;
use ndarray::Array2;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("input file {0} does not exist")]
    Missing(PathBuf),
    #[error("cannot read csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: cannot parse {value:?} at row {row}, column {col} as a number")]
    Parse {
        path: PathBuf,
        row: usize,
        col: usize,
        value: String,
    },
    #[error("{path}: row {row} has {found} values, expected {expected}")]
    Ragged {
        path: PathBuf,
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("{0} contains no rows")]
    Empty(PathBuf),
    #[error("{path}: labels must be a single column, found {cols}")]
    NotAColumn { path: PathBuf, cols: usize },
}

/// Reads CSV file of already encoded numbers into a dense `rows x cols` table
///
/// Input:
/// 0.1,1,0
/// 0.7,0,1
///
/// Output: a 2 x 3 matrix, row order preserved
pub fn read_csv_as_matrix<T>(filename: T, has_headers: bool) -> Result<Array2<f64>, FileError>
where
    T: AsRef<Path>,
{
    let path = filename.as_ref().to_path_buf();
    if !path.exists() {
        return Err(FileError::Missing(path));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(has_headers)
        .flexible(true)
        .from_path(&path)
        .map_err(|source| FileError::Csv {
            path: path.clone(),
            source,
        })?;

    let mut values: Vec<f64> = Vec::new();
    let mut n_cols: Option<usize> = None;
    let mut n_rows = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| FileError::Csv {
            path: path.clone(),
            source,
        })?;
        let expected = *n_cols.get_or_insert(record.len());
        if record.len() != expected {
            return Err(FileError::Ragged {
                path,
                row,
                found: record.len(),
                expected,
            });
        }
        for (col, field) in record.iter().enumerate() {
            let v = f64::from_str(field.trim()).map_err(|_| FileError::Parse {
                path: path.clone(),
                row,
                col,
                value: field.to_string(),
            })?;
            values.push(v);
        }
        n_rows += 1;
    }

    match n_cols {
        Some(cols) if n_rows > 0 => {
            debug!("{}: read {} rows, {} cols", path.display(), n_rows, cols);
            // shape always matches the number of pushed values
            Array2::from_shape_vec((n_rows, cols), values).map_err(|_| FileError::Empty(path))
        }
        _ => Err(FileError::Empty(path)),
    }
}

/// Reads a single column CSV file of labels
pub fn read_csv_as_labels<T>(filename: T, has_headers: bool) -> Result<Array1<f64>, FileError>
where
    T: AsRef<Path>,
{
    let table = read_csv_as_matrix(filename.as_ref(), has_headers)?;
    if table.ncols() != 1 {
        return Err(FileError::NotAColumn {
            path: filename.as_ref().to_path_buf(),
            cols: table.ncols(),
        });
    }
    Ok(table.column(0).to_owned())
}

/// Writes one value per line, used for predicted class labels
pub fn write_column_to_csv<T, V>(values: &[V], path: T) -> Result<(), FileError>
where
    T: AsRef<Path>,
    V: ToString,
{
    let path_buf = path.as_ref().to_path_buf();
    let to_err = |source| FileError::Csv {
        path: path_buf.clone(),
        source,
    };
    let mut wr = csv::WriterBuilder::new()
        .buffer_capacity(1024)
        .from_path(&path)
        .map_err(to_err)?;
    for v in values {
        wr.write_record(&[v.to_string()]).map_err(to_err)?;
    }
    wr.flush().map_err(|e| to_err(csv::Error::from(e)))?;
    Ok(())
}
