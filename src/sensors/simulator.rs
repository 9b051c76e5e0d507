// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Machine simulator for demo/testing

use rand::prelude::*;
use rand_distr::Uniform;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::MachineError;
use crate::machine::{MachineState, Reading, Status, TransitionTable};
use crate::store::ReadingStore;

/// Simulates a machine moving through its status cycle and the temperature and
/// speed that go with each status
pub struct MachineSimulator {
    machine: Arc<MachineState>,
    store: Arc<dyn ReadingStore>,
    rng: StdRng,
    sequence: u64,
}

impl MachineSimulator {
    pub fn new(machine: Arc<MachineState>, store: Arc<dyn ReadingStore>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!("Machine simulator ready (seed: {:?})", seed);

        Self {
            machine,
            store,
            rng,
            sequence: 0,
        }
    }

    /// Readings produced so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Advance the machine one tick and append the resulting reading
    pub fn step(&mut self) -> Result<Reading, MachineError> {
        let roll: f64 = self.rng.gen();
        let pick: f64 = self.rng.gen();

        let machine = &self.machine;
        let store = &self.store;
        let rng = &mut self.rng;

        let (status, reading) = machine.commit(
            |current| next_status(machine.table(), current, roll, pick),
            |_, to| {
                let (temperature, speed) = generate_values(rng, to);
                store.append(Reading::now(temperature, speed, to))
            },
        )?;

        self.sequence += 1;
        debug!(
            "Reading #{}: {} temp={} speed={}",
            self.sequence, status, reading.temperature, reading.speed
        );
        Ok(reading)
    }
}

/// Preferred next status for `current`, given two uniform draws in [0, 1).
///
/// Falls back to a random legal successor, or to staying put, when the configured
/// table does not allow the preferred move.
fn next_status(table: &TransitionTable, current: Status, roll: f64, pick: f64) -> Status {
    let successors = table.successors(current);
    let random_successor = || {
        if successors.is_empty() {
            current
        } else {
            let idx = ((pick * successors.len() as f64) as usize).min(successors.len() - 1);
            successors[idx]
        }
    };

    let preferred = match current {
        Status::Shutdown => Status::Started,
        Status::Started if roll < 0.9 => Status::Running,
        Status::Started => Status::Shutdown,
        Status::Running if roll < 0.1 => random_successor(),
        Status::Running => Status::Running,
        Status::Paused if roll < 0.8 => Status::Running,
        Status::Paused => Status::Shutdown,
        Status::Completed if roll < 0.7 => Status::Started,
        Status::Completed => Status::Shutdown,
    };

    if table.allows(current, preferred) {
        preferred
    } else {
        random_successor()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Temperature and speed typical of `status`
fn generate_values(rng: &mut StdRng, status: Status) -> (f64, f64) {
    let (temperature, speed) = match status {
        Status::Shutdown => (Uniform::new(15.0, 20.0), None),
        Status::Paused => (Uniform::new(20.0, 25.0), Some(Uniform::new(800.0, 1000.0))),
        Status::Running | Status::Started => {
            (Uniform::new(25.0, 35.0), Some(Uniform::new(1000.0, 2000.0)))
        }
        Status::Completed => (Uniform::new(20.0, 30.0), Some(Uniform::new(800.0, 1200.0))),
    };

    let temperature = round2(rng.sample(temperature));
    let speed = speed.map(|dist| round2(rng.sample(dist))).unwrap_or(0.0);
    (temperature, speed)
}
