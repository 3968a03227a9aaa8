//! # Voltlab
//!
//! An interactive electronic-circuit simulation engine: circuits are
//! assembled from typed elements, resolved into dense nodes by the
//! registry, stamped into an augmented MNA system and re-solved every
//! time step, with Newton-style sub-iteration for nonlinear devices and
//! companion models for the reactive ones.
//!
//! ## Quick start
//!
//! ```rust
//! use voltlab::prelude::*;
//!
//! // A 10 V divider: rail -> 1k -> node 2 -> 1k -> ground.
//! let mut sim = Simulation::new();
//! sim.add(Rail::dc(NodeId::new(1), 10.0));
//! sim.add(Resistor::new(NodeId::new(1), NodeId::new(2), 1000.0));
//! sim.add(Resistor::new(NodeId::new(2), NodeId::GROUND, 1000.0));
//!
//! sim.step().unwrap();
//! assert!((sim.voltage(NodeId::new(2)) - 5.0).abs() < 1e-9);
//! ```
//!
//! The schematic editor, rendering and persistence live elsewhere; this
//! workspace is the numerical core only.

pub use voltlab_core as core;
pub use voltlab_elements as elements;
pub use voltlab_engine as engine;

// Core types
pub use voltlab_core::{
    Element, Error as CoreError, Iteration, MnaSystem, NodeId, NodeMap, SimContext,
};

// Engine
pub use voltlab_engine::{
    ElementId, Error as EngineError, LuCache, SimConfig, Simulation, StepReport, Tolerances,
    converge, solve_dense,
};

// Element library
pub use voltlab_elements::{
    Capacitor, Cccs, Chip, CurrentSource, DFlipFlop, Diode, Gate, GateKind, Ground, Inductor,
    Integration, LogicInput, LogicOutput, Memristor, Pin, Rail, Resistor, Shape, Switch, Vccs,
    Vcvs, VoltageSource, Waveform, Wire,
};

/// Re-export of nalgebra's dynamic vector type.
pub use nalgebra::DVector;

/// Re-export of nalgebra's dynamic matrix type.
pub use nalgebra::DMatrix;

/// Commonly used types and traits.
///
/// ```rust
/// use voltlab::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Capacitor, CurrentSource, DFlipFlop, Diode, Element, Gate, GateKind, Ground, Inductor,
        Integration, LogicInput, LogicOutput, Memristor, NodeId, Rail, Resistor, SimConfig,
        Simulation, Switch, VoltageSource, Waveform, Wire,
    };
}
