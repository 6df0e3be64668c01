//  Copyright (c) Facebook, Inc. and its affiliates.
//   SPDX-License-Identifier: Apache-2.0

extern crate common;

use std::path::Path;

use common::files;
use common::timer;

use crate::shared::{TFeatures, TLabels};
use crate::vlr::ProtocolError;

/// Feature table plus labels of the active party
#[derive(Debug, Clone)]
pub struct LabeledData {
    pub features: TFeatures,
    pub labels: TLabels,
}

#[derive(Debug, Clone)]
pub struct ActiveData {
    pub train: LabeledData,
    pub validation: Option<LabeledData>,
}

#[derive(Debug, Clone)]
pub struct PassiveData {
    pub train: TFeatures,
    pub validation: Option<TFeatures>,
}

/// Files the active party reads, `None` where a path is not configured
#[derive(Debug, Clone, Default)]
pub struct ActivePaths<'a> {
    pub train_data: Option<&'a str>,
    pub train_labels: Option<&'a str>,
    pub val_data: Option<&'a str>,
    pub val_labels: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct PassivePaths<'a> {
    pub train_data: Option<&'a str>,
    pub val_data: Option<&'a str>,
}

fn required<'a>(path: Option<&'a str>, name: &str) -> Result<&'a str, ProtocolError> {
    path.ok_or_else(|| ProtocolError::ErrorMissingInput(name.to_string()))
}

pub fn load_features<T: AsRef<Path>>(path: T) -> Result<TFeatures, ProtocolError> {
    let t = timer::Builder::new()
        .label("load")
        .extra_label(&path.as_ref().display().to_string())
        .build();
    let table = files::read_csv_as_matrix(path, false)
        .map_err(|e| ProtocolError::ErrorIO(e.to_string()))?;
    info!(
        "Data initialised with dimensions: cols: {}, rows: {}",
        table.ncols(),
        table.nrows()
    );
    drop(t);
    Ok(table)
}

pub fn load_labels<T: AsRef<Path>>(path: T) -> Result<TLabels, ProtocolError> {
    files::read_csv_as_labels(path, false).map_err(|e| ProtocolError::ErrorIO(e.to_string()))
}

fn load_labeled(features: &str, labels: &str) -> Result<LabeledData, ProtocolError> {
    let features = load_features(features)?;
    let labels = load_labels(labels)?;
    if features.nrows() != labels.len() {
        return Err(ProtocolError::ErrorShape(format!(
            "{} feature rows but {} labels",
            features.nrows(),
            labels.len()
        )));
    }
    Ok(LabeledData { features, labels })
}

/// Training data is required, validation data is loaded when both
/// of its paths are present
pub fn load_active_data(paths: &ActivePaths) -> Result<ActiveData, ProtocolError> {
    let train_data = required(paths.train_data, "train_data_filename")?;
    let train_labels = required(paths.train_labels, "train_label_filename")?;
    let train = load_labeled(train_data, train_labels)?;
    info!("Load training data.");

    let validation = match (paths.val_data, paths.val_labels) {
        (Some(d), Some(l)) => Some(load_labeled(d, l)?),
        (Some(_), None) => {
            warn!("validation data without validation labels, skipping validation");
            None
        }
        _ => None,
    };
    Ok(ActiveData { train, validation })
}

pub fn load_passive_data(paths: &PassivePaths) -> Result<PassiveData, ProtocolError> {
    let train = load_features(required(paths.train_data, "train_data_filename")?)?;
    info!("Load training data.");
    let validation = paths.val_data.map(load_features).transpose()?;
    Ok(PassiveData { train, validation })
}
