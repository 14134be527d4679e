//! Reads the model-run envelope and writes results where it asks for them.
//!
//! The envelope is a JSON object of the form
//!
//! ```json
//! {
//!   "input": { "beta_0": 0.25, "epsilon": 0.5, "log_level": "debug" },
//!   "output": { "spec": "filesystem", "dir": "/tmp/output" }
//! }
//! ```
//!
//! `input` is deserialized into a [`ScenarioInput`] after the protocol keys `seed`,
//! `replicate` and `log_level` are removed from it. `output` may instead hold named
//! profiles under `profile`, in which case `default` (or else the first profile) is
//! used. Without a filesystem output, results go to stdout.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{LevelFilter, info};
use serde_json::Value;

use crate::error::{Result, SirError};
use crate::output::{LongRecord, write_long_csv};
use crate::scenario::ScenarioInput;

pub const LONG_FORM_FILENAME: &str = "sir_npi_long.csv";

pub struct Environment {
    pub input: ScenarioInput,
    pub seed: u64,
    pub replicate: u64,
    pub log_level: LevelFilter,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Result<Self> {
        let mut input_json = match data.get("input") {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(SirError::Envelope(format!(
                    "`input` must be an object, got {other}"
                )));
            }
            None => serde_json::Map::new(),
        };

        let seed = input_json
            .remove("seed")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let replicate = input_json
            .remove("replicate")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let log_level = match input_json.remove("log_level") {
            Some(Value::String(level)) => LevelFilter::from_str(&level)
                .map_err(|_| SirError::Envelope(format!("unknown log level `{level}`")))?,
            Some(other) => {
                return Err(SirError::Envelope(format!(
                    "`log_level` must be a string, got {other}"
                )));
            }
            None => LevelFilter::Info,
        };

        let input = serde_json::from_value(Value::Object(input_json))?;
        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Ok(Self {
            input,
            seed,
            replicate,
            log_level,
            output,
        })
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Err(SirError::Envelope("no input provided".to_string()));
        }
        Self::from_json(serde_json::from_str(&raw)?)
    }

    pub fn from_stdin() -> Result<Self> {
        Self::from_reader(io::stdin().lock())
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = filesystem_dir(&self.output) {
            return Some(dir);
        }
        let profiles = self.output.get("profile")?.as_object()?;
        let selected = profiles
            .get("default")
            .or_else(|| profiles.values().next())?;
        filesystem_dir(selected)
    }

    /// Writes the long-form records as CSV into the output directory, or to stdout.
    pub fn write_long_form(&self, records: &[LongRecord]) -> Result<()> {
        match self.output_dir() {
            Some(dir) => {
                let path = write_long_form_to_dir(&dir, records)?;
                info!("wrote {} records to {}", records.len(), path.display());
                Ok(())
            }
            None => write_long_csv(records, io::stdout().lock()),
        }
    }
}

fn filesystem_dir(output: &Value) -> Option<PathBuf> {
    if output.get("spec").and_then(|v| v.as_str()) != Some("filesystem") {
        return None;
    }
    output.get("dir").and_then(|v| v.as_str()).map(PathBuf::from)
}

fn write_long_form_to_dir(dir: &Path, records: &[LongRecord]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LONG_FORM_FILENAME);
    let mut file = fs::File::create(&path)?;
    write_long_csv(records, &mut file)?;
    file.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Compartment;
    use serde_json::json;

    #[test]
    fn test_from_json_basic() {
        let data = json!({
            "input": {
                "seed": 42,
                "replicate": 1,
                "beta_0": 0.3,
                "log_level": "debug"
            },
            "output": {
                "spec": "filesystem",
                "dir": "/tmp/output"
            }
        });
        let env = Environment::from_json(data).unwrap();
        assert_eq!(env.seed, 42);
        assert_eq!(env.replicate, 1);
        assert_eq!(env.log_level, LevelFilter::Debug);
        assert_eq!(env.input.beta_0, 0.3);
        assert_eq!(env.input.epsilon, ScenarioInput::default().epsilon);
        assert_eq!(env.output_dir(), Some(PathBuf::from("/tmp/output")));
    }

    #[test]
    fn test_output_dir_profiled() {
        let data = json!({
            "input": {},
            "output": {
                "profile": {
                    "default": {
                        "spec": "filesystem",
                        "dir": "/tmp/profiled"
                    }
                }
            }
        });
        let env = Environment::from_json(data).unwrap();
        assert_eq!(env.output_dir(), Some(PathBuf::from("/tmp/profiled")));
    }

    #[test]
    fn test_output_dir_none() {
        let data = json!({
            "input": {},
            "output": {
                "spec": "stdout"
            }
        });
        let env = Environment::from_json(data).unwrap();
        assert_eq!(env.output_dir(), None);
    }

    #[test]
    fn test_defaults() {
        let env = Environment::from_json(json!({})).unwrap();
        assert_eq!(env.seed, 0);
        assert_eq!(env.replicate, 0);
        assert_eq!(env.log_level, LevelFilter::Info);
        assert_eq!(env.input, ScenarioInput::default());
        assert_eq!(env.output_dir(), None);
    }

    #[test]
    fn test_rejects_malformed_envelopes() {
        assert!(matches!(
            Environment::from_json(json!({ "input": [1, 2] })),
            Err(SirError::Envelope(_))
        ));
        assert!(matches!(
            Environment::from_json(json!({ "input": { "log_level": "loud" } })),
            Err(SirError::Envelope(_))
        ));
        assert!(matches!(
            Environment::from_json(json!({ "input": { "betta": 0.3 } })),
            Err(SirError::Json(_))
        ));
        assert!(matches!(
            Environment::from_reader("   ".as_bytes()),
            Err(SirError::Envelope(_))
        ));
    }

    #[test]
    fn test_write_long_form_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let data = json!({
            "input": {},
            "output": { "spec": "filesystem", "dir": out.to_str().unwrap() }
        });
        let env = Environment::from_reader(data.to_string().as_bytes()).unwrap();
        let records = vec![
            LongRecord {
                time: 1.0,
                compartment: Compartment::S,
                value: 0.99,
            },
            LongRecord {
                time: 1.0,
                compartment: Compartment::I,
                value: 0.01,
            },
        ];
        env.write_long_form(&records).unwrap();
        let text = fs::read_to_string(out.join(LONG_FORM_FILENAME)).unwrap();
        assert_eq!(text, "time,compartment,value\n1.0,S,0.99\n1.0,I,0.01\n");
    }
}
