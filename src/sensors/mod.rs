//! Sensor module - simulated machine sensor stream

mod simulator;

pub use simulator::MachineSimulator;
