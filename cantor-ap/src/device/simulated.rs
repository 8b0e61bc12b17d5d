//! In-memory audio driver
//!
//! Backs the `simulated` driver mode (no audio hardware needed) and the test
//! suite. Properties live in a map; a `loadfile` command resets the position
//! and can be told to ignore the next few position writes, which models a
//! device that has not finished loading a track yet.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::driver::{AudioDriver, CMD_LOADFILE, PROP_PAUSE, PROP_PLAYBACK_TIME, PROP_VOLUME};
use crate::error::{Error, Result};

/// One recorded driver call
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    SetProperty(String, String),
    GetProperty(String),
    Command(Vec<String>),
    SetOption(String, String),
}

#[derive(Default)]
struct SimState {
    properties: HashMap<String, String>,
    failing_writes: HashSet<String>,
    failing_reads: HashSet<String>,
    failing_commands: HashSet<String>,
    /// Position writes ignored after each `loadfile`
    load_latency: u32,
    pending_ignored_writes: u32,
    /// Reported positions are rounded to a multiple of this (seconds)
    position_quantum: Option<f64>,
    calls: Vec<DriverCall>,
}

pub struct SimulatedDriver {
    state: Mutex<SimState>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(PROP_VOLUME.to_string(), "100".to_string());
        properties.insert(PROP_PAUSE.to_string(), "no".to_string());
        properties.insert(PROP_PLAYBACK_TIME.to_string(), "0".to_string());
        Self {
            state: Mutex::new(SimState {
                properties,
                ..SimState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ignore the first `writes` position writes after every track load
    pub fn with_load_latency(self, writes: u32) -> Self {
        self.lock().load_latency = writes;
        self
    }

    /// Round stored positions to a multiple of `quantum` seconds
    pub fn with_position_quantum(self, quantum: f64) -> Self {
        self.lock().position_quantum = Some(quantum);
        self
    }

    /// Make every write of property `name` (set_property or set_option) fail
    pub fn fail_writes_to(&self, name: &str) {
        self.lock().failing_writes.insert(name.to_string());
    }

    /// Make every read of property `name` fail
    pub fn fail_reads_of(&self, name: &str) {
        self.lock().failing_reads.insert(name.to_string());
    }

    /// Make every command whose first word is `command` fail
    pub fn fail_command(&self, command: &str) {
        self.lock().failing_commands.insert(command.to_string());
    }

    /// Current raw property value
    pub fn property(&self, name: &str) -> Option<String> {
        self.lock().properties.get(name).cloned()
    }

    /// Move the playhead as if audio had been playing (or the operator seeked)
    pub fn advance_playback_to(&self, seconds: f64) {
        self.lock()
            .properties
            .insert(PROP_PLAYBACK_TIME.to_string(), seconds.to_string());
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Every volume written via `set_property`, in order (fade steps)
    pub fn volume_property_writes(&self) -> Vec<f64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::SetProperty(name, value) if name == PROP_VOLUME => value.parse().ok(),
                _ => None,
            })
            .collect()
    }

    /// Number of `loadfile` commands executed
    pub fn load_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, DriverCall::Command(args) if args.first().map(String::as_str) == Some(CMD_LOADFILE)))
            .count()
    }

    fn write(state: &mut SimState, name: &str, value: &str) -> Result<()> {
        if state.failing_writes.contains(name) {
            return Err(Error::Device(format!("simulated failure writing '{}'", name)));
        }

        if name == PROP_PLAYBACK_TIME {
            if state.pending_ignored_writes > 0 {
                state.pending_ignored_writes -= 1;
                debug!("Simulated device still loading, position write ignored");
                return Ok(());
            }
            let seconds: f64 = value
                .parse()
                .map_err(|_| Error::Device(format!("invalid playback time '{}'", value)))?;
            let stored = match state.position_quantum {
                Some(q) if q > 0.0 => (seconds / q).round() * q,
                _ => seconds,
            };
            state
                .properties
                .insert(name.to_string(), stored.to_string());
            return Ok(());
        }

        state.properties.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioDriver for SimulatedDriver {
    async fn set_property(&self, name: &str, value: &str) -> Result<()> {
        let mut state = self.lock();
        state
            .calls
            .push(DriverCall::SetProperty(name.to_string(), value.to_string()));
        Self::write(&mut state, name, value)
    }

    async fn get_property(&self, name: &str) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(DriverCall::GetProperty(name.to_string()));
        if state.failing_reads.contains(name) {
            return Err(Error::Device(format!("simulated failure reading '{}'", name)));
        }
        state
            .properties
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Device(format!("property '{}' unavailable", name)))
    }

    async fn execute_command(&self, args: &[&str]) -> Result<()> {
        let mut state = self.lock();
        state
            .calls
            .push(DriverCall::Command(args.iter().map(|a| a.to_string()).collect()));

        let Some(command) = args.first() else {
            return Err(Error::Device("empty command".to_string()));
        };
        if state.failing_commands.contains(*command) {
            return Err(Error::Device(format!("simulated failure running '{}'", command)));
        }

        if *command == CMD_LOADFILE {
            let path = args.get(1).copied().unwrap_or_default();
            state.properties.insert("path".to_string(), path.to_string());
            state
                .properties
                .insert(PROP_PLAYBACK_TIME.to_string(), "0".to_string());
            state.pending_ignored_writes = state.load_latency;
        }
        Ok(())
    }

    async fn set_option(&self, name: &str, value: &str) -> Result<()> {
        let mut state = self.lock();
        state
            .calls
            .push(DriverCall::SetOption(name.to_string(), value.to_string()));
        Self::write(&mut state, name, value)
    }
}
