//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use clap::App;
use clap::Arg;
use log::info;

pub mod gen {
    use ndarray::s;
    use ndarray::Array1;
    use ndarray::Array2;
    use ndarray::Axis;
    use rand::Rng;
    use rand_distr::StandardNormal;

    pub struct Data {
        pub active: Array2<f64>,
        pub labels: Array1<f64>,
        pub passive: Vec<Array2<f64>>,
    }

    /// Draws features in `[0, 1)` and labels from a hidden logistic model,
    /// then cuts the columns into one active and `parties` passive tables
    pub fn random_data<R: Rng>(
        rng: &mut R,
        rows: usize,
        active_cols: usize,
        passive_cols: usize,
        parties: usize,
    ) -> Data {
        let total_cols = active_cols + passive_cols * parties;
        let features = Array2::from_shape_fn((rows, total_cols), |_| rng.gen::<f64>());
        let weights = Array1::from_shape_fn(total_cols, |_| rng.sample::<f64, _>(StandardNormal));
        let bias = -weights.sum() / 2.0;

        let labels = features
            .dot(&weights)
            .mapv(|z| 1.0 / (1.0 + (-(z + bias)).exp()))
            .mapv(|p| if rng.gen::<f64>() < p { 1.0 } else { 0.0 });

        let active = features.slice(s![.., ..active_cols]).to_owned();
        let passive = (0..parties)
            .map(|k| {
                let from = active_cols + k * passive_cols;
                features
                    .slice(s![.., from..from + passive_cols])
                    .to_owned()
            })
            .collect();

        Data {
            active,
            labels,
            passive,
        }
    }

    pub fn write_table_to_file(table: &Array2<f64>, path: &str) -> Result<(), csv::Error> {
        use indicatif::ProgressBar;

        let mut wr = csv::WriterBuilder::new()
            .buffer_capacity(1024)
            .from_path(path)?;
        let progress_bar = ProgressBar::new(table.nrows() as u64);
        for (i, row) in table.axis_iter(Axis(0)).enumerate() {
            let line = row.iter().map(|v| format!("{}", v)).collect::<Vec<String>>();
            wr.write_record(&line)?;
            if i % 100 == 0 {
                progress_bar.inc(100);
            }
        }
        progress_bar.finish();
        wr.flush()?;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = App::new("Vertical LR data")
        .version("0.1")
        .about("Generates a vertically partitioned dataset for local runs")
        .arg(
            Arg::with_name("dir")
                .short("d")
                .long("dir")
                .value_name("DIR")
                .help("output dir")
                .takes_value(true)
                .default_value("./"),
        )
        .arg(
            Arg::with_name("size")
                .short("n")
                .long("size")
                .value_name("SIZE")
                .help("number of records")
                .takes_value(true)
                .default_value("100"),
        )
        .arg(
            Arg::with_name("parties")
                .short("p")
                .long("parties")
                .value_name("PARTIES")
                .help("number of passive parties")
                .takes_value(true)
                .default_value("1"),
        )
        .arg(
            Arg::with_name("cols")
                .short("c")
                .long("cols")
                .value_name("COLS")
                .help("feature columns per party")
                .takes_value(true)
                .default_value("4"),
        )
        .get_matches();

    let size = matches.value_of("size").unwrap_or("100").parse::<usize>()?;
    let parties = matches.value_of("parties").unwrap_or("1").parse::<usize>()?;
    let cols = matches.value_of("cols").unwrap_or("4").parse::<usize>()?;
    let dir = matches.value_of("dir").unwrap_or("./");

    info!(
        "Generating {} records, {} passive parties, {} columns each",
        size, parties, cols
    );
    let data = gen::random_data(&mut rand::thread_rng(), size, cols, cols, parties);

    let fn_active = format!("{}/active_features.csv", dir);
    gen::write_table_to_file(&data.active, &fn_active)?;
    info!("File {} finished", fn_active);

    let fn_labels = format!("{}/active_labels.csv", dir);
    let labels = data.labels.insert_axis(ndarray::Axis(1));
    gen::write_table_to_file(&labels, &fn_labels)?;
    info!("File {} finished", fn_labels);

    for (k, table) in data.passive.iter().enumerate() {
        let fn_passive = format!("{}/passive_{}_features.csv", dir, k);
        gen::write_table_to_file(table, &fn_passive)?;
        info!("File {} finished", fn_passive);
    }

    info!("Bye!");
    Ok(())
}
