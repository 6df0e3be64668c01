//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![crate_name = "crypto"]

#[macro_use]
extern crate log;

pub mod blinding;
pub mod matrix;
pub mod prelude;
pub mod random;
