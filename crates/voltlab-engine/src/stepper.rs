//! Time-step driver.
//!
//! [`Simulation`] owns the element list and advances simulated time one
//! tick at a time. Each tick rebuilds whatever the pending edits
//! require (full topology analysis, fixed re-stamp, or nothing),
//! refreshes companion models, runs the nonlinear iteration controller,
//! and commits. A tick that fails to converge is retried with a halved
//! step down to a bounded minimum; fatal errors abort the tick and
//! force a clean rebuild on the next attempt, so no partially mutated
//! matrix survives.

use nalgebra::DVector;
use voltlab_core::registry::{self, NodeMap};
use voltlab_core::{Element, MnaSystem, NodeId, SimContext};

use crate::error::Result;
use crate::linear::LuCache;
use crate::newton::{self, Tolerances};

/// Driver configuration.
///
/// The caps and tolerances are tuning knobs, not load-bearing design;
/// hosts may adjust them freely between ticks.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Nominal time step (s).
    pub time_step: f64,
    /// Convergence tolerances for the sub-iteration loop.
    pub tolerances: Tolerances,
    /// Sub-iteration cap per attempt.
    pub max_iterations: usize,
    /// How many times a failing step is halved before the failure
    /// surfaces to the host.
    pub max_step_halvings: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_step: 5e-6,
            tolerances: Tolerances::default(),
            max_iterations: 200,
            max_step_halvings: 8,
        }
    }
}

/// What a committed tick looked like.
#[derive(Debug, Clone, Copy)]
pub struct StepReport {
    /// Step size actually used (equals the nominal step unless the
    /// adaptive policy shrank it).
    pub time_step: f64,
    /// Sub-iterations needed to converge.
    pub iterations: usize,
}

/// Handle for an element owned by a [`Simulation`].
pub type ElementId = usize;

/// The simulation: element list, node map, MNA system and clock.
#[derive(Debug)]
pub struct Simulation {
    elements: Vec<Box<dyn Element>>,
    config: SimConfig,
    time: f64,
    node_map: Option<NodeMap>,
    mna: MnaSystem,
    lu: LuCache,
    solution: DVector<f64>,
    needs_analysis: bool,
    needs_stamp: bool,
    /// Step size the fixed stamps were built with; companion
    /// resistances depend on it.
    stamped_step: f64,
}

impl Simulation {
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    pub fn with_config(config: SimConfig) -> Self {
        Self {
            elements: Vec::new(),
            config,
            time: 0.0,
            node_map: None,
            mna: MnaSystem::new(0, 0),
            lu: LuCache::new(),
            solution: DVector::zeros(0),
            needs_analysis: true,
            needs_stamp: true,
            stamped_step: 0.0,
        }
    }

    /// Add an element; returns its handle.
    pub fn add<E: Element>(&mut self, element: E) -> ElementId {
        self.elements.push(Box::new(element));
        self.needs_analysis = true;
        self.elements.len() - 1
    }

    pub fn element(&self, id: ElementId) -> &dyn Element {
        &*self.elements[id]
    }

    /// Mutable element access for host edits. Follow up with
    /// [`Simulation::invalidate_topology`] or
    /// [`Simulation::invalidate_values`] depending on the edit class.
    pub fn element_mut(&mut self, id: ElementId) -> &mut dyn Element {
        &mut *self.elements[id]
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// The element's reported current (A).
    pub fn current(&self, id: ElementId) -> f64 {
        self.elements[id].current()
    }

    /// Connectivity changed (element added/removed, switch toggled):
    /// rebuild the node map and everything after it.
    pub fn invalidate_topology(&mut self) {
        self.needs_analysis = true;
    }

    /// A value changed with connectivity intact: rebuild the fixed
    /// stamps only.
    pub fn invalidate_values(&mut self) {
        self.needs_stamp = true;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SimConfig {
        &mut self.config
    }

    /// Solved voltage at an editor junction. Ground and unknown
    /// junctions read 0.
    pub fn voltage(&self, junction: NodeId) -> f64 {
        let Some(map) = &self.node_map else {
            return 0.0;
        };
        match map.node_of(junction).and_then(NodeId::index) {
            Some(i) if i < self.solution.len() => self.solution[i],
            _ => 0.0,
        }
    }

    /// Restart from the initial operating state without touching the
    /// topology.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.solution.fill(0.0);
        for element in &mut self.elements {
            element.reset();
        }
    }

    /// Advance one tick.
    pub fn step(&mut self) -> Result<StepReport> {
        if self.needs_analysis {
            self.analyze()?;
        } else if self.needs_stamp || self.stamped_step != self.config.time_step {
            self.stamp_fixed(self.config.time_step);
        }

        let mut dt = self.config.time_step;
        let mut halvings = 0;
        loop {
            if self.stamped_step != dt {
                self.stamp_fixed(dt);
            }
            let ctx = SimContext {
                time: self.time,
                time_step: dt,
            };
            for element in &mut self.elements {
                element.begin_step(&ctx);
            }

            match newton::converge(
                &mut self.elements,
                &mut self.mna,
                &mut self.lu,
                &mut self.solution,
                &self.config.tolerances,
                self.config.max_iterations,
            ) {
                Ok(iterations) => {
                    self.commit(&ctx);
                    self.time += dt;
                    return Ok(StepReport {
                        time_step: dt,
                        iterations,
                    });
                }
                Err(err) if err.is_fatal() => {
                    // Leave nothing half-stamped behind.
                    self.needs_analysis = true;
                    return Err(err);
                }
                Err(err) => {
                    if halvings >= self.config.max_step_halvings {
                        return Err(err);
                    }
                    halvings += 1;
                    dt *= 0.5;
                }
            }
        }
    }

    /// Advance `ticks` steps, stopping at the first error.
    pub fn run(&mut self, ticks: usize) -> Result<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    /// Rebuild the node map, branch banks and fixed stamps.
    fn analyze(&mut self) -> Result<()> {
        let map = registry::analyze(&mut self.elements)?;

        let mut branches = 0;
        for element in &mut self.elements {
            let count = element.voltage_source_count();
            for n in 0..count {
                element.set_branch(n, branches + n);
            }
            branches += count;
        }

        self.mna = MnaSystem::new(map.matrix_nodes(), branches);
        self.solution = DVector::zeros(self.mna.size());
        self.lu = LuCache::new();
        self.node_map = Some(map);
        self.needs_analysis = false;
        self.stamp_fixed(self.config.time_step);
        Ok(())
    }

    fn stamp_fixed(&mut self, time_step: f64) {
        self.mna.clear();
        let ctx = SimContext {
            time: self.time,
            time_step,
        };
        for element in &mut self.elements {
            element.stamp(&mut self.mna, &ctx);
        }
        self.mna.snapshot_fixed();
        self.lu.invalidate();
        self.stamped_step = time_step;
        self.needs_stamp = false;
    }

    /// Post-convergence: hand out branch currents, let elements compute
    /// their reported currents, then advance latched state.
    fn commit(&mut self, ctx: &SimContext) {
        let num_nodes = self.mna.num_nodes();
        let mut branch = 0;
        for element in &mut self.elements {
            let count = element.voltage_source_count();
            for n in 0..count {
                element.set_branch_current(n, self.solution[num_nodes + branch + n]);
            }
            branch += count;
        }
        for element in &mut self.elements {
            element.update_current();
        }
        for element in &mut self.elements {
            element.end_step(ctx);
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed-conductance resistor standing in for the element library.
    #[derive(Debug)]
    struct TestResistor {
        junctions: [NodeId; 2],
        nodes: [NodeId; 2],
        volts: [f64; 2],
        ohms: f64,
    }

    impl TestResistor {
        fn new(a: u32, b: u32, ohms: f64) -> Self {
            Self {
                junctions: [NodeId::new(a), NodeId::new(b)],
                nodes: [NodeId::new(a), NodeId::new(b)],
                volts: [0.0; 2],
                ohms,
            }
        }
    }

    impl Element for TestResistor {
        fn post_count(&self) -> usize {
            2
        }
        fn junction(&self, post: usize) -> NodeId {
            self.junctions[post]
        }
        fn post_node(&self, post: usize) -> NodeId {
            self.nodes[post]
        }
        fn set_post_node(&mut self, post: usize, node: NodeId) {
            self.nodes[post] = node;
        }
        fn stamp(&mut self, mna: &mut MnaSystem, _ctx: &SimContext) {
            mna.stamp_resistor(self.nodes[0], self.nodes[1], self.ohms);
        }
        fn set_voltage(&mut self, post: usize, volts: f64) {
            self.volts[post] = volts;
        }
        fn reset(&mut self) {
            self.volts = [0.0; 2];
        }
    }

    /// DC rail standing in for the source library.
    #[derive(Debug)]
    struct TestRail {
        junction: NodeId,
        node: NodeId,
        volts: f64,
        value: f64,
        branch: usize,
    }

    impl Element for TestRail {
        fn post_count(&self) -> usize {
            1
        }
        fn junction(&self, _post: usize) -> NodeId {
            self.junction
        }
        fn post_node(&self, _post: usize) -> NodeId {
            self.node
        }
        fn set_post_node(&mut self, _post: usize, node: NodeId) {
            self.node = node;
        }
        fn voltage_source_count(&self) -> usize {
            1
        }
        fn set_branch(&mut self, _n: usize, branch: usize) {
            self.branch = branch;
        }
        fn has_ground_connection(&self, _post: usize) -> bool {
            true
        }
        fn stamp(&mut self, mna: &mut MnaSystem, _ctx: &SimContext) {
            mna.stamp_voltage_source(self.node, NodeId::GROUND, self.branch, self.value);
        }
        fn set_voltage(&mut self, _post: usize, volts: f64) {
            self.volts = volts;
        }
        fn reset(&mut self) {
            self.volts = 0.0;
        }
    }

    fn divider() -> (Simulation, ElementId) {
        let mut sim = Simulation::new();
        sim.add(TestRail {
            junction: NodeId::new(1),
            node: NodeId::new(1),
            volts: 0.0,
            value: 10.0,
            branch: 0,
        });
        sim.add(TestResistor::new(1, 2, 1000.0));
        let r2 = sim.add(TestResistor::new(2, 0, 1000.0));
        (sim, r2)
    }

    #[test]
    fn test_divider_tick() {
        let (mut sim, _) = divider();
        let report = sim.step().unwrap();
        assert!(report.iterations >= 2);
        assert!((sim.voltage(NodeId::new(1)) - 10.0).abs() < 1e-9);
        assert!((sim.voltage(NodeId::new(2)) - 5.0).abs() < 1e-9);
        assert!((sim.time() - sim.config().time_step).abs() < 1e-18);
    }

    #[test]
    fn test_empty_circuit_is_topology_error() {
        let mut sim = Simulation::new();
        let err = sim.step().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_value_edit_restamps() {
        let (mut sim, r2) = divider();
        sim.step().unwrap();

        sim.element_mut(r2)
            .downcast_mut::<TestResistor>()
            .unwrap()
            .ohms = 3000.0;
        sim.invalidate_values();
        sim.step().unwrap();

        assert!((sim.voltage(NodeId::new(2)) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_time_step_change_restamps() {
        let (mut sim, _) = divider();
        sim.step().unwrap();
        sim.config_mut().time_step = 1e-6;
        let report = sim.step().unwrap();
        assert_eq!(report.time_step, 1e-6);
    }
}
