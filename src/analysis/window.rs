//! Bounded window of the most recent readings

use std::collections::VecDeque;

use crate::machine::Reading;

/// The latest `capacity` readings, oldest first.
///
/// Pushing into a full window evicts the oldest reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    capacity: usize,
    readings: VecDeque<Reading>,
}

impl Window {
    /// Empty window; a zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity),
        }
    }

    /// Window over the tail of `readings`
    pub fn from_readings(capacity: usize, readings: impl IntoIterator<Item = Reading>) -> Self {
        let mut window = Self::new(capacity);
        for reading in readings {
            window.push(reading);
        }
        window
    }

    pub fn push(&mut self, reading: Reading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn first(&self) -> Option<&Reading> {
        self.readings.front()
    }

    pub fn last(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> + '_ {
        self.readings.iter()
    }

    pub(crate) fn values(&self, field: fn(&Reading) -> f64) -> Vec<f64> {
        self.readings.iter().map(field).collect()
    }
}
