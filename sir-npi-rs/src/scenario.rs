use serde::Deserialize;

use crate::error::{Result, SirError, invalid};
use crate::parameters::{NpiWindow, ParameterSet, SimulationConfig, SolverOptions, State};

/// Recovery rate used when neither `gamma` nor `infectious_period` is given.
pub const DEFAULT_GAMMA: f64 = 1.0 / 7.0;

/// Largest number of output times a `t_start`/`t_end`/`t_step` grid may produce.
pub const MAX_TIME_POINTS: usize = 10_000_000;

/// User-facing description of a run. Every field has a default, which together
/// describe a 365-day outbreak with a 50% effective intervention on days 10-51.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioInput {
    pub beta_0: f64,
    pub gamma: Option<f64>,
    /// Alternative to `gamma`; the recovery rate is its reciprocal.
    pub infectious_period: Option<f64>,
    pub epsilon: f64,
    pub npi_start: Option<f64>,
    pub npi_end: Option<f64>,
    pub initial_state: State,
    pub population: f64,
    /// Explicit output times. Takes precedence over `t_start`/`t_end`/`t_step`.
    pub times: Option<Vec<f64>>,
    pub t_start: f64,
    pub t_end: f64,
    pub t_step: f64,
    pub solver: SolverOptions,
}

impl Default for ScenarioInput {
    fn default() -> Self {
        ScenarioInput {
            beta_0: 0.25,
            gamma: None,
            infectious_period: None,
            epsilon: 0.5,
            npi_start: Some(10.0),
            npi_end: Some(51.0),
            initial_state: State::new(0.99, 0.01, 0.0),
            population: 1.0,
            times: None,
            t_start: 1.0,
            t_end: 365.0,
            t_step: 1.0,
            solver: SolverOptions::default(),
        }
    }
}

impl ScenarioInput {
    pub fn from_toml_str(text: &str) -> Result<ScenarioInput> {
        Ok(toml::from_str(text)?)
    }

    fn recovery_rate(&self) -> Result<f64> {
        match (self.gamma, self.infectious_period) {
            (Some(_), Some(_)) => Err(invalid(
                "only one of gamma and infectious_period may be given",
            )),
            (Some(gamma), None) => Ok(gamma),
            (None, Some(period)) if period.is_finite() && period > 0.0 => Ok(1.0 / period),
            (None, Some(period)) => Err(invalid(format!(
                "infectious_period must be positive, got {period}"
            ))),
            (None, None) => Ok(DEFAULT_GAMMA),
        }
    }

    fn npi_window(&self) -> Result<Option<NpiWindow>> {
        match (self.npi_start, self.npi_end) {
            (Some(start), Some(end)) => Ok(Some(NpiWindow::new(start, end)?)),
            (None, None) => Ok(None),
            _ => Err(invalid("npi_start and npi_end must be given together")),
        }
    }

    fn time_grid(&self) -> Result<Vec<f64>> {
        if let Some(times) = &self.times {
            return Ok(times.clone());
        }
        let (start, end, step) = (self.t_start, self.t_end, self.t_step);
        if !(step.is_finite() && step > 0.0) {
            return Err(invalid(format!("t_step must be positive, got {step}")));
        }
        if !(start.is_finite() && end.is_finite()) || end < start {
            return Err(invalid(format!(
                "cannot build a time grid from {start} to {end}"
            )));
        }
        // Tolerate rounding in (end - start) / step when end lands on the grid.
        let steps = ((end - start) / step + 1e-9).floor();
        if !steps.is_finite() || steps >= MAX_TIME_POINTS as f64 {
            return Err(invalid(format!(
                "time grid from {start} to {end} in steps of {step} exceeds \
                 {MAX_TIME_POINTS} points"
            )));
        }
        let steps = steps as usize;
        Ok((0..=steps).map(|k| start + k as f64 * step).collect())
    }
}

impl TryFrom<ScenarioInput> for SimulationConfig {
    type Error = SirError;

    fn try_from(input: ScenarioInput) -> Result<SimulationConfig> {
        let parameters = ParameterSet::new(input.beta_0, input.recovery_rate()?, input.epsilon)?;
        SimulationConfig::new(
            input.initial_state,
            input.population,
            parameters,
            input.npi_window()?,
            input.time_grid()?,
        )?
        .with_solver_options(input.solver)
    }
}
