//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0
use std::fs::File;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct RawMetrics {
    role: String,
    epochs_completed: usize,
    batches_completed: usize,
    mean_batch_secs: Option<f64>,
    training_secs: Option<f64>,
    validation_accuracy: Option<f64>,
}

impl RawMetrics {
    fn save_metrics(&self, path: &str) -> Result<(), serde_json::Error> {
        let f = File::create(path).map_err(serde_json::Error::io)?;
        serde_json::to_writer(f, &self)
    }

    fn print_metrics(&self) -> Result<(), serde_json::Error> {
        println!("-----BEGIN METRIC VIEW-----");
        println!("{}", serde_json::to_string(&self)?);
        println!("-----END METRIC VIEW-----");
        Ok(())
    }
}

/// Telemetry handle of one party
///
/// Constructed once by the binary and handed to the role, which reports
/// progress through it instead of a process wide logger. Every event is
/// forwarded to the `log` facade with the role as prefix.
#[derive(Debug)]
pub struct Metrics {
    role: String,
    epochs_completed: Arc<RwLock<usize>>,
    batch_durations: Arc<RwLock<Vec<Duration>>>,
    training_time: Arc<RwLock<Option<Duration>>>,
    validation_accuracy: Arc<RwLock<Option<f64>>>,
}

impl Metrics {
    pub fn new(role: &str) -> Metrics {
        Metrics {
            role: role.to_string(),
            epochs_completed: Arc::new(RwLock::default()),
            batch_durations: Arc::new(RwLock::default()),
            training_time: Arc::new(RwLock::default()),
            validation_accuracy: Arc::new(RwLock::default()),
        }
    }

    pub fn event(&self, msg: &str) {
        info!("========== [{}] {}", self.role, msg);
    }

    pub fn record_batch(&self, elapsed: Duration) {
        if let Ok(mut d) = self.batch_durations.write() {
            d.push(elapsed);
        }
        self.event(&format!(
            "Time of training a batch: {:.4} seconds.",
            elapsed.as_secs_f64()
        ));
    }

    pub fn record_epoch(&self) {
        if let Ok(mut d) = self.epochs_completed.write() {
            *d += 1;
        }
    }

    pub fn set_training_time(&self, elapsed: Duration) {
        if let Ok(mut d) = self.training_time.write() {
            *d = Some(elapsed);
        }
        self.event(&format!(
            "Training is over, the total time is {:.4} seconds.",
            elapsed.as_secs_f64()
        ));
    }

    pub fn set_validation_accuracy(&self, accuracy: f64) {
        if let Ok(mut d) = self.validation_accuracy.write() {
            *d = Some(accuracy);
        }
        self.event(&format!("Validation accuracy: {:.4}", accuracy));
    }

    pub fn epochs_completed(&self) -> usize {
        self.epochs_completed.read().map(|d| *d).unwrap_or_default()
    }

    pub fn batches_completed(&self) -> usize {
        self.batch_durations.read().map(|d| d.len()).unwrap_or_default()
    }

    fn cp_to_raw(&self) -> RawMetrics {
        let (batches_completed, mean_batch_secs) = match self.batch_durations.read() {
            Ok(d) if !d.is_empty() => {
                let total: f64 = d.iter().map(Duration::as_secs_f64).sum();
                (d.len(), Some(total / d.len() as f64))
            }
            _ => (0, None),
        };
        RawMetrics {
            role: self.role.clone(),
            epochs_completed: self.epochs_completed(),
            batches_completed,
            mean_batch_secs,
            training_secs: self
                .training_time
                .read()
                .ok()
                .and_then(|d| d.map(|x| x.as_secs_f64())),
            validation_accuracy: self.validation_accuracy.read().ok().and_then(|d| *d),
        }
    }

    pub fn save_metrics(&self, path: &str) -> Result<(), serde_json::Error> {
        self.cp_to_raw().save_metrics(path)
    }

    pub fn print_metrics(&self) -> Result<(), serde_json::Error> {
        self.cp_to_raw().print_metrics()
    }
}
