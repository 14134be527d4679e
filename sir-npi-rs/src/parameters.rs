use serde::Deserialize;

use crate::error::{Result, invalid};

/// Relative tolerance used when checking that the initial state sums to the
/// declared population.
const POPULATION_TOLERANCE: f64 = 1e-9;

/// Susceptible, infectious and recovered compartments, as fractions or counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct State {
    pub s: f64,
    pub i: f64,
    pub r: f64,
}

impl State {
    pub fn new(s: f64, i: f64, r: f64) -> State {
        State { s, i, r }
    }

    pub fn total(&self) -> f64 {
        self.s + self.i + self.r
    }

    pub fn is_finite(&self) -> bool {
        self.s.is_finite() && self.i.is_finite() && self.r.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    beta_0: f64,
    gamma: f64,
    epsilon: f64,
}

impl ParameterSet {
    /// `beta_0` is the baseline transmission rate, `gamma` the recovery rate and
    /// `epsilon` the fraction by which the intervention reduces transmission.
    pub fn new(beta_0: f64, gamma: f64, epsilon: f64) -> Result<ParameterSet> {
        if !(beta_0.is_finite() && beta_0 > 0.0) {
            return Err(invalid(format!("beta_0 must be positive, got {beta_0}")));
        }
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(invalid(format!("gamma must be positive, got {gamma}")));
        }
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(invalid(format!(
                "epsilon must be between 0 and 1, got {epsilon}"
            )));
        }
        Ok(ParameterSet {
            beta_0,
            gamma,
            epsilon,
        })
    }

    pub fn beta_0(&self) -> f64 {
        self.beta_0
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Pre-intervention basic reproduction number, `beta_0 / gamma`.
    pub fn basic_reproduction_number(&self) -> f64 {
        self.beta_0 / self.gamma
    }
}

/// Closed time interval `[t_start, t_end]` during which transmission is reduced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NpiWindow {
    t_start: f64,
    t_end: f64,
}

impl NpiWindow {
    pub fn new(t_start: f64, t_end: f64) -> Result<NpiWindow> {
        if !(t_start.is_finite() && t_end.is_finite()) {
            return Err(invalid(format!(
                "NPI window bounds must be finite, got [{t_start}, {t_end}]"
            )));
        }
        if t_start > t_end {
            return Err(invalid(format!(
                "NPI window start {t_start} is after its end {t_end}"
            )));
        }
        Ok(NpiWindow { t_start, t_end })
    }

    pub fn t_start(&self) -> f64 {
        self.t_start
    }

    pub fn t_end(&self) -> f64 {
        self.t_end
    }

    pub fn contains(&self, t: f64) -> bool {
        self.t_start <= t && t <= self.t_end
    }
}

/// Error tolerances handed to the adaptive solver.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverOptions {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            rtol: 1e-8,
            atol: 1e-10,
        }
    }
}

impl SolverOptions {
    fn validate(&self) -> Result<()> {
        if !(self.rtol.is_finite() && self.rtol > 0.0) {
            return Err(invalid(format!("rtol must be positive, got {}", self.rtol)));
        }
        if !(self.atol.is_finite() && self.atol > 0.0) {
            return Err(invalid(format!("atol must be positive, got {}", self.atol)));
        }
        Ok(())
    }
}

/// Everything a single run needs. Only constructed through [`SimulationConfig::new`],
/// so a value of this type always satisfies the model's invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    initial_state: State,
    population: f64,
    parameters: ParameterSet,
    npi_window: Option<NpiWindow>,
    time_grid: Vec<f64>,
    solver: SolverOptions,
}

impl SimulationConfig {
    /// Validates and bundles a run. `npi_window` of `None` runs the model without
    /// an intervention. The first entry of `time_grid` is the time of `initial_state`.
    pub fn new(
        initial_state: State,
        population: f64,
        parameters: ParameterSet,
        npi_window: Option<NpiWindow>,
        time_grid: Vec<f64>,
    ) -> Result<SimulationConfig> {
        if !(population.is_finite() && population > 0.0) {
            return Err(invalid(format!(
                "population must be positive, got {population}"
            )));
        }
        for (name, value) in [
            ("S", initial_state.s),
            ("I", initial_state.i),
            ("R", initial_state.r),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(format!(
                    "initial {name} must be non-negative, got {value}"
                )));
            }
        }
        let total = initial_state.total();
        if (total - population).abs() > POPULATION_TOLERANCE * population.max(1.0) {
            return Err(invalid(format!(
                "initial state sums to {total}, expected population {population}"
            )));
        }

        if time_grid.is_empty() {
            return Err(invalid("time grid is empty"));
        }
        if let Some(t) = time_grid.iter().find(|t| !t.is_finite()) {
            return Err(invalid(format!("time grid contains non-finite time {t}")));
        }
        if let Some(pair) = time_grid.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(invalid(format!(
                "time grid is not strictly increasing at {} -> {}",
                pair[0], pair[1]
            )));
        }

        Ok(SimulationConfig {
            initial_state,
            population,
            parameters,
            npi_window,
            time_grid,
            solver: SolverOptions::default(),
        })
    }

    pub fn with_solver_options(mut self, solver: SolverOptions) -> Result<SimulationConfig> {
        solver.validate()?;
        self.solver = solver;
        Ok(self)
    }

    /// The same run with a different intervention effectiveness.
    pub fn with_epsilon(&self, epsilon: f64) -> Result<SimulationConfig> {
        let parameters =
            ParameterSet::new(self.parameters.beta_0, self.parameters.gamma, epsilon)?;
        Ok(SimulationConfig {
            parameters,
            ..self.clone()
        })
    }

    pub fn initial_state(&self) -> State {
        self.initial_state
    }

    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Start and end of the intervention, for annotating output.
    pub fn npi_window(&self) -> Option<NpiWindow> {
        self.npi_window
    }

    pub fn time_grid(&self) -> &[f64] {
        &self.time_grid
    }

    pub fn solver_options(&self) -> &SolverOptions {
        &self.solver
    }
}
