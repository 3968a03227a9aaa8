//! Error taxonomy: fatal topology/singular conditions vs recoverable
//! convergence failures.

use voltlab::prelude::*;
use voltlab::{CoreError, EngineError};

/// An island with no conductive path to ground is a topology error,
/// not a silent zero/NaN solution.
#[test]
fn test_floating_island_is_topology_error() {
    let mut sim = Simulation::new();
    sim.add(Rail::dc(NodeId::new(1), 5.0));
    sim.add(Resistor::new(NodeId::new(1), NodeId::GROUND, 1000.0));
    // Disconnected pair off to the side.
    sim.add(Resistor::new(NodeId::new(7), NodeId::new(8), 1000.0));

    let err = sim.step().unwrap_err();
    assert!(err.is_fatal());
    assert!(
        matches!(err, EngineError::Topology(CoreError::NoGroundPath { .. })),
        "got {err:?}"
    );
}

/// A circuit with no ground reference anywhere cannot be solved.
#[test]
fn test_missing_ground_is_topology_error() {
    let mut sim = Simulation::new();
    sim.add(VoltageSource::dc(NodeId::new(1), NodeId::new(2), 5.0));
    sim.add(Resistor::new(NodeId::new(1), NodeId::new(2), 1000.0));

    let err = sim.step().unwrap_err();
    assert!(matches!(
        err,
        EngineError::Topology(CoreError::NoGround)
    ));
}

/// A current source driving a node with no other connection passes the
/// connectivity walk but leaves a zero row: singular matrix.
#[test]
fn test_dangling_current_source_is_singular() {
    let mut sim = Simulation::new();
    sim.add(CurrentSource::new(NodeId::GROUND, NodeId::new(1), 0.01));

    let err = sim.step().unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, EngineError::SingularMatrix), "got {err:?}");
}

/// Two sources fighting over one node: contradictory constraints make
/// the augmented matrix singular.
#[test]
fn test_conflicting_sources_are_singular() {
    let mut sim = Simulation::new();
    sim.add(Rail::dc(NodeId::new(1), 5.0));
    sim.add(Rail::dc(NodeId::new(1), 3.0));
    sim.add(Resistor::new(NodeId::new(1), NodeId::GROUND, 1000.0));

    let err = sim.step().unwrap_err();
    assert!(matches!(err, EngineError::SingularMatrix), "got {err:?}");
}

/// An empty schematic is rejected before any matrix work.
#[test]
fn test_empty_circuit() {
    let mut sim = Simulation::new();
    let err = sim.step().unwrap_err();
    assert!(matches!(
        err,
        EngineError::Topology(CoreError::EmptyCircuit)
    ));
}

/// After a fatal error, fixing the circuit and stepping again works:
/// nothing half-stamped survives the failed tick.
#[test]
fn test_recovery_after_fatal_error() {
    let mut sim = Simulation::new();
    sim.add(Rail::dc(NodeId::new(1), 5.0));
    sim.add(Resistor::new(NodeId::new(1), NodeId::GROUND, 1000.0));
    sim.add(Resistor::new(NodeId::new(7), NodeId::new(8), 1000.0));

    assert!(sim.step().is_err());

    // Wire the island down to ground; the next tick succeeds.
    sim.add(Wire::new(NodeId::new(8), NodeId::GROUND));
    sim.step().expect("repaired circuit should solve");
    assert!((sim.voltage(NodeId::new(1)) - 5.0).abs() < 1e-9);
}
