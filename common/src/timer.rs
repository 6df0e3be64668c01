//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::time::Duration;
use std::time::Instant;

/// A naive wall-clock timer for training phases
///
/// Output goes through the `log` facade, make sure a logger backend is
/// configured. A non-silent timer reports on drop, so a block scoped timer
/// measures exactly that block.
///
/// Log output may look like
/// `[2023-03-14T10:02:11Z INFO  common::timer] [active | batch 3] elapsed: 0.00625 sec [rows: 128]`
///
/// # Example
///
/// ```
/// use common::timer;
/// {
///     let _t = timer::Builder::new()
///         .label("active")
///         .extra_label("batch 0")
///         .size(128)
///         .build();
///     // work on the batch
/// } // logs the elapsed time here
/// ```
pub struct Timer {
    start: Instant,
    label: String,
    extra_label: Option<String>,
    size: Option<usize>,
    silent: bool,
}

/// Semantics assumes that imports happen as:
///
/// ```
/// use common::timer;
/// let t = timer::Builder::new().silent(true).build();
/// ```
pub struct Builder {
    label: String,
    extra_label: Option<String>,
    size: Option<usize>,
    silent: bool,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            label: String::new(),
            extra_label: None,
            size: None,
            silent: false,
        }
    }

    pub fn label(&mut self, label: &str) -> &mut Builder {
        self.label = String::from(label);
        self
    }

    pub fn extra_label(&mut self, extra_label: &str) -> &mut Builder {
        self.extra_label = Some(String::from(extra_label));
        self
    }

    /// Number of rows processed, reported next to the elapsed time
    pub fn size(&mut self, size: usize) -> &mut Builder {
        self.size = Some(size);
        self
    }

    pub fn silent(&mut self, silent: bool) -> &mut Builder {
        self.silent = silent;
        self
    }

    /// Starts the clock
    pub fn build(&self) -> Timer {
        Timer {
            start: Instant::now(),
            label: self.label.clone(),
            extra_label: self.extra_label.clone(),
            size: self.size,
            silent: self.silent,
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// A silent timer will not fire on exiting the execution block
    pub fn new_silent(label: &str) -> Timer {
        Builder::new().label(label).silent(true).build()
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns a formatted string with labels and elapsed seconds
    pub fn elapsed_str(&self, label: Option<&str>) -> String {
        let secs = self.elapsed().as_secs_f64();
        let fixed_label = label
            .or(self.extra_label.as_deref())
            .map(|x| format!(" | {}", x))
            .unwrap_or_default();
        let fixed_size = self
            .size
            .map(|x| format!(" [rows: {}]", x))
            .unwrap_or_default();
        format!(
            "[{}{}] elapsed: {:.5} sec{}",
            self.label, fixed_label, secs, fixed_size
        )
    }

    /// Sends the formatted elapsed time to `log.info`
    pub fn elapsed_log(&self, label: Option<&str>) {
        info!("{}", self.elapsed_str(label));
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer, label: {}", self.label)
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.silent {
            self.elapsed_log(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let t = Builder::new()
            .label("active")
            .extra_label("batch 1")
            .size(64)
            .silent(true)
            .build();
        assert!(t.silent);
        assert_eq!(t.size, Some(64));
        assert_eq!(t.extra_label.as_deref(), Some("batch 1"));
    }

    #[test]
    fn elapsed_str_contains_labels() {
        let t = Builder::new()
            .label("passive")
            .extra_label("epoch 2")
            .size(10)
            .silent(true)
            .build();
        let s = t.elapsed_str(None);
        assert!(s.starts_with("[passive | epoch 2]"));
        assert!(s.ends_with("[rows: 10]"));

        let s = t.elapsed_str(Some("override"));
        assert!(s.starts_with("[passive | override]"));
    }
}
