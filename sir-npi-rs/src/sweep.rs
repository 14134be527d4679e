use log::info;
use rayon::prelude::*;

use crate::error::Result;
use crate::integrate::simulate;
use crate::output::Trajectory;
use crate::parameters::SimulationConfig;

/// Runs `config` once per intervention effectiveness, in parallel. Results keep the
/// order of `epsilons`; an invalid epsilon fails only its own run.
pub fn sweep_epsilon(
    config: &SimulationConfig,
    epsilons: &[f64],
) -> Vec<(f64, Result<Trajectory>)> {
    info!("sweeping {} values of epsilon", epsilons.len());
    epsilons
        .par_iter()
        .map(|&epsilon| {
            let result = config
                .with_epsilon(epsilon)
                .and_then(|scenario| simulate(&scenario));
            (epsilon, result)
        })
        .collect()
}
