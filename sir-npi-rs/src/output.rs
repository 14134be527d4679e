use std::fmt;
use std::io::Write;

use serde::Serialize;

use crate::error::{Result, SirError};
use crate::parameters::State;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Compartment {
    S,
    I,
    R,
}

impl Compartment {
    /// Order in which compartments appear in long-form output.
    pub const ALL: [Compartment; 3] = [Compartment::S, Compartment::I, Compartment::R];

    pub fn value_in(&self, state: &State) -> f64 {
        match self {
            Compartment::S => state.s,
            Compartment::I => state.i,
            Compartment::R => state.r,
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compartment::S => write!(f, "S"),
            Compartment::I => write!(f, "I"),
            Compartment::R => write!(f, "R"),
        }
    }
}

/// One state per requested time point, in grid order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<State>,
}

impl Trajectory {
    pub(crate) fn new(times: Vec<f64>, states: Vec<State>) -> Result<Trajectory> {
        if times.len() != states.len() {
            return Err(SirError::SimulationFailed {
                t: times.last().copied().unwrap_or(f64::NAN),
                reason: format!(
                    "solver returned {} states for {} time points",
                    states.len(),
                    times.len()
                ),
            });
        }
        Ok(Trajectory { times, states })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &State)> {
        self.times.iter().copied().zip(self.states.iter())
    }

    /// Time and size of the largest infectious compartment on the grid. Ties keep
    /// the earliest time.
    pub fn peak_infectious(&self) -> Option<(f64, f64)> {
        self.iter().fold(None, |peak, (t, state)| match peak {
            Some((_, i)) if i >= state.i => peak,
            _ => Some((t, state.i)),
        })
    }

    /// Susceptibles infected between the first and last grid points.
    pub fn final_size(&self) -> Option<f64> {
        Some(self.states.first()?.s - self.states.last()?.s)
    }

    /// Writes `time,S,I,R` rows.
    pub fn write_wide_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for (time, state) in self.iter() {
            wtr.serialize(WideRow {
                time,
                s: state.s,
                i: state.i,
                r: state.r,
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct WideRow {
    time: f64,
    #[serde(rename = "S")]
    s: f64,
    #[serde(rename = "I")]
    i: f64,
    #[serde(rename = "R")]
    r: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LongRecord {
    pub time: f64,
    pub compartment: Compartment,
    pub value: f64,
}

/// Pivots a trajectory into one record per time and compartment, ordered by time
/// and then S, I, R.
pub fn to_long_form(trajectory: &Trajectory) -> Vec<LongRecord> {
    trajectory
        .iter()
        .flat_map(|(time, state)| {
            Compartment::ALL.map(|compartment| LongRecord {
                time,
                compartment,
                value: compartment.value_in(state),
            })
        })
        .collect()
}

/// Writes `time,compartment,value` rows.
pub fn write_long_csv<W: Write>(records: &[LongRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trajectory() -> Trajectory {
        Trajectory::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![
                State::new(0.99, 0.01, 0.0),
                State::new(0.97, 0.02, 0.01),
                State::new(0.95, 0.02, 0.03),
                State::new(0.94, 0.01, 0.05),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_long_form_shape() {
        let trajectory = trajectory();
        let records = to_long_form(&trajectory);
        assert_eq!(records.len(), 3 * trajectory.len());
        for (triple, (t, state)) in records.chunks(3).zip(trajectory.iter()) {
            assert!(triple.iter().all(|record| record.time == t));
            let compartments: Vec<Compartment> = triple.iter().map(|r| r.compartment).collect();
            assert_eq!(compartments, Compartment::ALL.to_vec());
            assert_eq!(triple[0].value, state.s);
            assert_eq!(triple[1].value, state.i);
            assert_eq!(triple[2].value, state.r);
        }
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = Trajectory::new(vec![0.0, 1.0], vec![State::new(1.0, 0.0, 0.0)]);
        assert!(matches!(result, Err(SirError::SimulationFailed { .. })));
    }

    #[test]
    fn test_peak_and_final_size() {
        let trajectory = trajectory();
        assert_eq!(trajectory.peak_infectious(), Some((1.0, 0.02)));
        assert!((trajectory.final_size().unwrap() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_summaries_of_empty_trajectory() {
        let empty = Trajectory::new(vec![], vec![]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.peak_infectious(), None);
        assert_eq!(empty.final_size(), None);
        assert!(to_long_form(&empty).is_empty());
    }

    #[test]
    fn test_write_long_csv() {
        let mut buffer = Vec::new();
        let records = to_long_form(&trajectory());
        write_long_csv(&records[..3], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "time,compartment,value\n0.0,S,0.99\n0.0,I,0.01\n0.0,R,0.0\n"
        );
    }

    #[test]
    fn test_write_wide_csv() {
        let mut buffer = Vec::new();
        trajectory().write_wide_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("time,S,I,R"));
        assert_eq!(lines.next(), Some("0.0,0.99,0.01,0.0"));
        assert_eq!(lines.next(), Some("1.0,0.97,0.02,0.01"));
        assert_eq!(text.lines().count(), 5);
    }
}
