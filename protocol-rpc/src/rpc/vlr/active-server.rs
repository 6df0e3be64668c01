//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

#[macro_use]
extern crate log;
extern crate clap;

use std::sync::Arc;

use clap::{App, Arg};
use common::files;
use common::metrics::Metrics;
use protocol::fileio::load_active_data;
use protocol::vlr::accuracy;
use rpc::connect::session::ActiveSession;
use rpc::rpc::vlr::active::ActiveRole;
use rpc::rpc::vlr::{During, Phase, Role, TrainerRole, TrainingError};
use rpc::settings::Settings;

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("VLR Active Party")
        .version("0.1")
        .about("Masked vertical logistic regression, label holding party")
        .args(&[
            Arg::with_name("config")
                .long("config")
                .short("c")
                .takes_value(true)
                .required(true)
                .help("Path to the JSON settings file"),
            Arg::with_name("output")
                .long("output")
                .short("o")
                .takes_value(true)
                .help("Path to write validation predictions to, one label per line"),
            Arg::with_name("metrics")
                .long("metrics")
                .takes_value(true)
                .help("Path to write run metrics to, overrides metrics_path"),
        ])
        .get_matches();

    let settings = Settings::from_file(matches.value_of("config").unwrap_or_default())
        .map_err(TrainingError::Config)?;
    let output_path = matches.value_of("output");
    let metrics_path = matches
        .value_of("metrics")
        .map(String::from)
        .or_else(|| settings.metrics_path.clone());

    // every input is read before the listener opens
    let data = load_active_data(&settings.active_paths()).during(Role::Active, Phase::Setup)?;
    let addr = settings.listen_addr().map_err(TrainingError::Config)?;
    let metrics = Arc::new(Metrics::new("active"));

    info!(
        "Waiting for {} passive parties at {}",
        settings.party_count, addr
    );
    let mut session = ActiveSession::listen(&addr, settings.party_count, settings.read_buffer_size)
        .await
        .during(Role::Active, Phase::Setup)?;
    session.set_max_frame_length(settings.max_frame_length);

    let mut role = ActiveRole::new(
        session,
        data.train,
        settings.training_params(),
        metrics.clone(),
    )?;
    role.fit().await?;

    if let Some(validation) = data.validation {
        metrics.event("Start validation.");
        let predicted = role.predict(&validation.features).await?;
        let agreement = accuracy(&predicted, &validation.labels)
            .during(Role::Active, Phase::Prediction)?;
        metrics.set_validation_accuracy(agreement);
        if let Some(path) = output_path {
            files::write_column_to_csv(&predicted.to_vec(), path)?;
            info!("Predictions written to {}", path);
        }
    } else if output_path.is_some() {
        warn!("No validation data configured, nothing to write");
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
