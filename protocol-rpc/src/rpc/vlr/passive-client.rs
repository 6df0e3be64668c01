//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

#[macro_use]
extern crate log;
extern crate clap;

use std::sync::Arc;

use clap::{App, Arg};
use common::metrics::Metrics;
use protocol::fileio::load_passive_data;
use rpc::connect::session::PassiveSession;
use rpc::rpc::vlr::passive::PassiveRole;
use rpc::rpc::vlr::{During, Phase, Role, TrainerRole, TrainingError};
use rpc::settings::Settings;

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("VLR Passive Party")
        .version("0.1")
        .about("Masked vertical logistic regression, feature holding party")
        .args(&[
            Arg::with_name("config")
                .long("config")
                .short("c")
                .takes_value(true)
                .required(true)
                .help("Path to the JSON settings file"),
            Arg::with_name("metrics")
                .long("metrics")
                .takes_value(true)
                .help("Path to write run metrics to, overrides metrics_path"),
        ])
        .get_matches();

    let settings = Settings::from_file(matches.value_of("config").unwrap_or_default())
        .map_err(TrainingError::Config)?;
    let metrics_path = matches
        .value_of("metrics")
        .map(String::from)
        .or_else(|| settings.metrics_path.clone());

    let data = load_passive_data(&settings.passive_paths()).during(Role::Passive, Phase::Setup)?;
    let addr = settings.active_addr().map_err(TrainingError::Config)?;
    let metrics = Arc::new(Metrics::new("passive"));

    let mut session = PassiveSession::connect(&addr, settings.read_buffer_size)
        .await
        .during(Role::Passive, Phase::Setup)?;
    session.set_max_frame_length(settings.max_frame_length);
    info!("Connected to active party at {}", addr);

    let mut role = PassiveRole::new(
        session,
        data.train,
        settings.training_params(),
        metrics.clone(),
    );
    role.fit().await?;

    // the active party must have validation rows configured as well
    if let Some(validation) = data.validation {
        metrics.event("Start validation.");
        role.predict(&validation).await?;
    }

    match metrics_path {
        Some(path) => metrics.save_metrics(&path)?,
        None => metrics.print_metrics()?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    if let Err(e) = run().await {
        error!("{}", e);
        return Err(e);
    }
    info!("Bye!");
    Ok(())
}
