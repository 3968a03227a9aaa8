//! Circuit element library for Voltlab.
//!
//! Every element here implements the `voltlab_core::Element` contract.
//! Shared behavior is composed from the helpers in [`body`] and
//! [`chip`] rather than inherited: two-terminal devices embed a
//! [`body::TwoTerminal`], multi-pin packages embed a [`chip::Chip`].

pub mod body;
pub mod chip;
pub mod controlled;
pub mod diode;
pub mod logic;
pub mod memristor;
pub mod passive;
pub mod sources;
pub mod wiring;

pub use chip::{Chip, DFlipFlop, Pin};
pub use controlled::{Cccs, Vccs, Vcvs};
pub use diode::Diode;
pub use logic::{Gate, GateKind, LogicInput, LogicOutput};
pub use memristor::Memristor;
pub use passive::{Capacitor, Inductor, Integration, Resistor};
pub use sources::{CurrentSource, Rail, Shape, VoltageSource, Waveform};
pub use wiring::{Ground, Switch, Wire};
