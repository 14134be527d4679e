use log::{debug, trace, warn};
use ode_solvers::{Dopri5, System, Vector3};

use crate::error::{Result, SirError};
use crate::model::{EpidemicModel, SirNpiModel};
use crate::output::Trajectory;
use crate::parameters::{SimulationConfig, SolverOptions, State};

/// Relative distance the solver is run past each segment end, so that its dense
/// output always covers the end point.
const END_TIME_OVERSHOOT: f64 = 1e-10;

/// Relative slack allowed between a dense output time and the segment end.
const END_TIME_TOLERANCE: f64 = 1e-9;

/// Adapts an [`EpidemicModel`] to the solver for one segment. The solver works in
/// local time `tau` starting at 0; the model only ever sees times inside the segment.
struct Segment<'a, M: ?Sized> {
    model: &'a M,
    origin: f64,
    span: f64,
}

impl<M: EpidemicModel + ?Sized> System<f64, Vector3<f64>> for Segment<'_, M> {
    fn system(&self, tau: f64, y: &Vector3<f64>, dy: &mut Vector3<f64>) {
        let t = self.origin + tau.min(self.span);
        let d = self.model.derivative(t, &to_state(y));
        dy[0] = d.s;
        dy[1] = d.i;
        dy[2] = d.r;
    }
}

fn to_state(y: &Vector3<f64>) -> State {
    State::new(y[0], y[1], y[2])
}

fn to_vector(state: State) -> Vector3<f64> {
    Vector3::new(state.s, state.i, state.r)
}

/// Runs the SIR model described by `config`.
pub fn simulate(config: &SimulationConfig) -> Result<Trajectory> {
    integrate(config, &SirNpiModel::from_config(config))
}

/// Integrates `model` from the config's initial state, returning one state per
/// grid point. The first grid point carries the initial state unchanged.
pub fn integrate<M: EpidemicModel + ?Sized>(
    config: &SimulationConfig,
    model: &M,
) -> Result<Trajectory> {
    let grid = config.time_grid();
    let options = config.solver_options();
    debug!(
        "integrating {} time points from t = {} with rtol = {}, atol = {}",
        grid.len(),
        grid[0],
        options.rtol,
        options.atol
    );

    let max_step = model.max_step(config.population());
    let mut breakpoints = model.breakpoints();
    breakpoints.sort_by(f64::total_cmp);
    breakpoints.dedup();

    let mut current = config.initial_state();
    let mut states = Vec::with_capacity(grid.len());
    states.push(current);
    for pair in grid.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let mut from = start;
        let interior = breakpoints.iter().copied().filter(|&b| b > start && b < end);
        for to in interior.chain(std::iter::once(end)) {
            current = advance(model, from, to, current, options, max_step)?;
            from = to;
        }
        states.push(current);
    }

    Trajectory::new(grid.to_vec(), states)
}

/// Advances `state` from `from` to `to` in equal pieces no longer than `max_step`.
/// A fresh stepper per piece also caps the solver's own step at the piece length.
fn advance<M: EpidemicModel + ?Sized>(
    model: &M,
    from: f64,
    to: f64,
    state: State,
    options: &SolverOptions,
    max_step: Option<f64>,
) -> Result<State> {
    let span = to - from;
    let pieces = match max_step {
        Some(h) if h > 0.0 && span > h => (span / h).ceil() as usize,
        _ => 1,
    };
    let mut current = state;
    let mut start = from;
    for k in 1..=pieces {
        let end = if k == pieces {
            to
        } else {
            from + span * (k as f64 / pieces as f64)
        };
        current = advance_piece(model, start, end, current, options)?;
        start = end;
    }
    Ok(current)
}

fn advance_piece<M: EpidemicModel + ?Sized>(
    model: &M,
    from: f64,
    to: f64,
    state: State,
    options: &SolverOptions,
) -> Result<State> {
    let span = to - from;
    let system = Segment {
        model,
        origin: from,
        span,
    };
    let mut stepper = Dopri5::new(
        system,
        0.0,
        span + span * END_TIME_OVERSHOOT,
        span,
        to_vector(state),
        options.rtol,
        options.atol,
    );
    let stats = stepper.integrate().map_err(|e| {
        warn!("solver failed on [{from}, {to}]: {e}");
        SirError::SimulationFailed {
            t: from,
            reason: e.to_string(),
        }
    })?;
    trace!(
        "[{from}, {to}]: {} evaluations, {} accepted steps, {} rejected steps",
        stats.num_eval, stats.accepted_steps, stats.rejected_steps
    );

    // Dense output point closest to the segment end.
    let reached = stepper
        .x_out()
        .iter()
        .zip(stepper.y_out())
        .filter(|(tau, _)| (**tau - span).abs() <= END_TIME_TOLERANCE * span)
        .min_by(|(a, _), (b, _)| (**a - span).abs().total_cmp(&(**b - span).abs()))
        .map(|(_, y)| to_state(y))
        .ok_or_else(|| SirError::SimulationFailed {
            t: to,
            reason: "solver stopped before the requested time point".to_string(),
        })?;
    if !reached.is_finite() {
        return Err(SirError::SimulationFailed {
            t: to,
            reason: format!("non-finite state {reached:?}"),
        });
    }
    Ok(reached)
}
