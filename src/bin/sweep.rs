use efc::{synthetic::LinearSystem, Config, DarkZone, Efc, Jacobian};
use std::{env, time::Instant};

/// Runs the EFC loop for every row of the CSV file given by `EFC_CONFIG`
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = env::var("EFC_CONFIG").expect("EFC_CONFIG env var is not set");
    let mut rdr = csv::Reader::from_path(&path)?;
    let configs = rdr.deserialize().collect::<Result<Vec<Config>, csv::Error>>()?;
    log::info!("{} runs in {path}", configs.len());

    let n_actuator = env::var("N_ACTUATOR").map_or(Ok(24), |n| n.parse::<usize>())?;
    let n_sample = 4 * n_actuator;
    let model = LinearSystem::fourier(n_actuator, n_sample, 0.05);
    let dark_zone = DarkZone::new(n_sample / 2 + 3..n_sample - n_sample / 8, n_sample)?;

    println!(
        "{:>4} {:>9} {:>6} {:>9} {:>10} {:>5} {:>10} {:>10}",
        "run", "epsilon", "probes", "rcond", "reg.", "gain", "contrast", "time[ms]"
    );
    for (i, config) in configs.iter().enumerate() {
        let now = Instant::now();
        let mut model = model.clone();
        let jacobian = Jacobian::estimate_with(&mut model, &dark_zone, &config.probes())?;
        let mut efc = Efc::builder(model, dark_zone.clone())
            .jacobian(jacobian)
            .regularization(config.regularization())
            .loop_gain(config.loop_gain)
            .build()?;
        let history = efc.run(config.n_iteration)?;
        let contrast = history
            .contrast(&dark_zone, 1f64)?
            .last()
            .cloned()
            .unwrap_or(f64::NAN);
        println!(
            "{:>4} {:>9.1e} {:>6} {:>9.1e} {:>10} {:>5.2} {:>10.3e} {:>10}",
            i,
            config.epsilon,
            config.n_probe,
            config.rcond,
            format!("{:?}", config.regularization),
            config.loop_gain,
            contrast,
            now.elapsed().as_millis()
        );
    }

    Ok(())
}
