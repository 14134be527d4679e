//! An SIR epidemic model whose transmission rate is reduced during a scheduled
//! non-pharmaceutical intervention (NPI).
//!
//! A [`SimulationConfig`] bundles the initial state, rates, optional NPI window and
//! output times. [`simulate`] integrates it with an adaptive Dormand-Prince solver
//! and returns a [`Trajectory`], which [`to_long_form`] pivots into one
//! [`LongRecord`] per time and compartment.
//!
//! ```no_run
//! use sir_npi::{NpiWindow, ParameterSet, SimulationConfig, State, simulate, to_long_form};
//!
//! let config = SimulationConfig::new(
//!     State::new(0.99, 0.01, 0.0),
//!     1.0,
//!     ParameterSet::new(0.25, 1.0 / 7.0, 0.5)?,
//!     Some(NpiWindow::new(10.0, 51.0)?),
//!     (1..=365).map(f64::from).collect(),
//! )?;
//! let records = to_long_form(&simulate(&config)?);
//! assert_eq!(records.len(), 3 * 365);
//! # Ok::<(), sir_npi::SirError>(())
//! ```

pub mod environment;
pub mod error;
pub mod integrate;
pub mod logging;
pub mod model;
pub mod output;
pub mod parameters;
pub mod scenario;
pub mod schedule;
pub mod sweep;

pub use error::{Result, SirError};
pub use integrate::{integrate, simulate};
pub use model::{EpidemicModel, SirNpiModel, derivative};
pub use output::{Compartment, LongRecord, Trajectory, to_long_form, write_long_csv};
pub use parameters::{NpiWindow, ParameterSet, SimulationConfig, SolverOptions, State};
pub use scenario::ScenarioInput;
pub use schedule::effective_beta;
pub use sweep::sweep_epsilon;
