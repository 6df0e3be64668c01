//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

extern crate crypto;
extern crate protocol;

pub mod connect;
pub mod proto;
pub mod rpc;
pub mod settings;
