use efc::{synthetic::LinearSystem, ActuatorLayout, Config, DarkZone, Efc, Jacobian};
use linya::{Bar, Progress};
use std::{env, path::Path};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match env::var("EFC_CONFIG") {
        Ok(path) => {
            let index = env::var("EFC_RUN_INDEX").map_or(Ok(0), |i| i.parse::<usize>())?;
            Config::from_csv(path, index)?
        }
        Err(_) => Config::from_env()?,
    };
    println!("EFC parameters:");
    println!("{:#?}", config);

    // 2 deformable mirrors, each controlling half of the pupil
    let n_actuator = env::var("N_ACTUATOR").map_or(Ok(12), |n| n.parse::<usize>())?;
    let layout = ActuatorLayout::new()
        .mirror("DM1", n_actuator)
        .mirror("DM2", n_actuator);
    let n_sample = 4 * layout.n_actuator();
    let model = LinearSystem::fourier(layout.n_actuator(), n_sample, 0.05);
    let dark_zone = DarkZone::new(n_sample / 2 + 3..n_sample - n_sample / 8, n_sample)?;
    log::info!(
        "{} actuators, dark zone of {} samples",
        layout.n_actuator(),
        dark_zone.len()
    );

    let maybe_calibration = env::var("EFC_JACOBIAN").ok();
    let builder = Efc::builder(model, dark_zone)
        .regularization(config.regularization())
        .loop_gain(config.loop_gain);
    let builder = match maybe_calibration.as_ref() {
        Some(path) if Path::new(path).exists() => {
            log::info!("loading Jacobian from {path}");
            builder.jacobian(Jacobian::load(path)?)
        }
        _ => builder.probes(config.probes()),
    };
    let mut efc = builder.build()?;
    if let Some(path) = maybe_calibration {
        if !Path::new(&path).exists() {
            efc.jacobian().save(&path)?;
            log::info!("Jacobian saved to {path}");
        }
    }

    let mut progress = Progress::new();
    let bar: Bar = progress.bar(config.n_iteration, "EFC");
    let history = efc.run_until(config.n_iteration, |_, _| {
        progress.inc_and_draw(&bar, 1);
        false
    })?;

    // the synthetic system peak intensity without coronagraph is 1
    let contrast = history.contrast(efc.dark_zone(), 1f64)?;
    if let (Some(first), Some(last)) = (contrast.first(), contrast.last()) {
        println!("Dark zone contrast: {first:.3e} -> {last:.3e}");
    }
    for (mirror, rms) in layout.mirrors().zip(layout.rms(efc.actuators())?) {
        println!("{} RMS command: {:.3e}", mirror.name, rms);
    }

    let filename = format!("efc_{}.pkl", chrono::Local::now().format("%Y%m%dT%H%M%S"));
    history.to_pickle(&filename)?;
    println!("History saved to {filename}");

    Ok(())
}
