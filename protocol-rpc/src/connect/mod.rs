//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

pub mod channel;
pub mod create_client;
pub mod create_server;
pub mod session;
