use std::process::ExitCode;

use log::info;
use sir_npi::environment::Environment;
use sir_npi::logging::init_logging;
use sir_npi::{SimulationConfig, simulate, to_long_form};

fn run() -> sir_npi::Result<()> {
    let env = Environment::from_stdin()?;
    init_logging(env.log_level)?;
    info!("replicate {} (seed {})", env.replicate, env.seed);

    let config = SimulationConfig::try_from(env.input.clone())?;
    info!(
        "R0 = {:.3}, NPI window = {:?}",
        config.parameters().basic_reproduction_number(),
        config.npi_window()
    );

    let trajectory = simulate(&config)?;
    if let Some((time, peak)) = trajectory.peak_infectious() {
        info!("peak infectious {peak:.6} at t = {time}");
    }
    if let Some(final_size) = trajectory.final_size() {
        info!("final size {final_size:.6}");
    }

    env.write_long_form(&to_long_form(&trajectory))
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
