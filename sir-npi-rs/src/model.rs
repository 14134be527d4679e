use crate::parameters::{NpiWindow, ParameterSet, SimulationConfig, State};
use crate::schedule::effective_beta;

/// Right-hand side of an epidemic ODE, as consumed by the integration driver.
pub trait EpidemicModel {
    fn derivative(&self, t: f64, state: &State) -> State;

    /// Times at which the right-hand side is discontinuous. The driver never lets
    /// the solver step across one of these.
    fn breakpoints(&self) -> Vec<f64> {
        Vec::new()
    }

    /// Longest step the solver may take while every compartment stays within
    /// `population`. `None` leaves the step size to the solver.
    fn max_step(&self, _population: f64) -> Option<f64> {
        None
    }
}

/// SIR dynamics with transmission reduced during the NPI window. Without a
/// window the baseline rate applies at all times.
pub fn derivative(
    t: f64,
    state: &State,
    parameters: &ParameterSet,
    window: Option<NpiWindow>,
) -> State {
    let beta = match window {
        Some(window) => effective_beta(t, parameters.beta_0(), window, parameters.epsilon()),
        None => parameters.beta_0(),
    };
    let infections = beta * state.s * state.i;
    let recoveries = parameters.gamma() * state.i;
    State {
        s: -infections,
        i: infections - recoveries,
        r: recoveries,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SirNpiModel {
    parameters: ParameterSet,
    window: Option<NpiWindow>,
}

impl SirNpiModel {
    pub fn new(parameters: ParameterSet, window: Option<NpiWindow>) -> SirNpiModel {
        SirNpiModel { parameters, window }
    }

    pub fn from_config(config: &SimulationConfig) -> SirNpiModel {
        SirNpiModel::new(*config.parameters(), config.npi_window())
    }
}

impl EpidemicModel for SirNpiModel {
    fn derivative(&self, t: f64, state: &State) -> State {
        derivative(t, state, &self.parameters, self.window)
    }

    fn breakpoints(&self) -> Vec<f64> {
        match self.window {
            Some(window) if self.parameters.epsilon() != 0.0 => {
                vec![window.t_start(), window.t_end()]
            }
            _ => Vec::new(),
        }
    }

    /// Bounds the Jacobian's spectral radius by `beta_0 * population + gamma` and
    /// keeps `h * lambda` at most 1, well inside the explicit method's stability region.
    fn max_step(&self, population: f64) -> Option<f64> {
        Some(1.0 / (self.parameters.beta_0() * population + self.parameters.gamma()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn parameters(epsilon: f64) -> ParameterSet {
        ParameterSet::new(0.25, 1.0 / 7.0, epsilon).unwrap()
    }

    fn window() -> Option<NpiWindow> {
        Some(NpiWindow::new(10.0, 51.0).unwrap())
    }

    #[test]
    fn test_derivative_matches_equations() {
        let state = State::new(0.99, 0.01, 0.0);
        let d = derivative(0.0, &state, &parameters(0.5), window());
        assert_abs_diff_eq!(d.s, -0.25 * 0.99 * 0.01, epsilon = 1e-15);
        assert_abs_diff_eq!(d.i, 0.25 * 0.99 * 0.01 - 0.01 / 7.0, epsilon = 1e-15);
        assert_abs_diff_eq!(d.r, 0.01 / 7.0, epsilon = 1e-15);
    }

    #[test]
    fn test_derivative_uses_reduced_rate_in_window() {
        let state = State::new(0.6, 0.3, 0.1);
        let d = derivative(20.0, &state, &parameters(0.5), window());
        assert_abs_diff_eq!(d.s, -0.125 * 0.6 * 0.3, epsilon = 1e-15);
    }

    #[test]
    fn test_derivative_sums_to_zero() {
        let states = [
            State::new(0.99, 0.01, 0.0),
            State::new(0.5, 0.25, 0.25),
            State::new(0.0, 0.0, 1.0),
            State::new(9_000.0, 900.0, 100.0),
        ];
        for epsilon in [0.0, 0.3, 1.0] {
            for state in &states {
                for t in [0.0, 9.99, 10.0, 33.3, 51.0, 200.0] {
                    let d = derivative(t, state, &parameters(epsilon), window());
                    let scale = state.total().max(1.0);
                    assert_abs_diff_eq!(d.s + d.i + d.r, 0.0, epsilon = 1e-12 * scale);
                }
            }
        }
    }

    #[test]
    fn test_derivative_is_deterministic() {
        let state = State::new(0.7, 0.2, 0.1);
        let a = derivative(12.5, &state, &parameters(0.4), window());
        let b = derivative(12.5, &state, &parameters(0.4), window());
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_window_is_baseline() {
        let state = State::new(0.7, 0.2, 0.1);
        let with_zero_epsilon = derivative(20.0, &state, &parameters(0.0), window());
        let without_window = derivative(20.0, &state, &parameters(0.9), None);
        assert_eq!(with_zero_epsilon, without_window);
    }

    #[test]
    fn test_model_breakpoints() {
        let model = SirNpiModel::new(parameters(0.5), window());
        assert_eq!(model.breakpoints(), vec![10.0, 51.0]);
        assert!(SirNpiModel::new(parameters(0.0), window()).breakpoints().is_empty());
        assert!(SirNpiModel::new(parameters(0.5), None).breakpoints().is_empty());
    }

    #[test]
    fn test_model_max_step() {
        let model = SirNpiModel::new(parameters(0.5), window());
        let expected = 1.0 / (0.25 + 1.0 / 7.0);
        assert_abs_diff_eq!(model.max_step(1.0).unwrap(), expected, epsilon = 1e-12);
        let counts = model.max_step(10_000.0).unwrap();
        assert!(counts < 1e-3);
    }
}
