//! Logic-level elements: inputs, outputs and gates.
//!
//! Gates follow the interactive-simulator convention: inputs are ideal
//! high-impedance senses, the output is a voltage source referenced to
//! ground driving through a small series resistance. The source lands
//! on an internal node so the series resistance sits between it and the
//! output post. The logic function is re-evaluated from the current
//! input estimate every sub-iteration.

use voltlab_core::units::format_unit;
use voltlab_core::{Element, Iteration, MnaSystem, NodeId, SimContext};

/// Logic-high drive level (V).
pub(crate) const HIGH_VOLTS: f64 = 5.0;
/// Input threshold (V).
pub(crate) const THRESHOLD: f64 = 2.5;
/// Gate output series resistance (Ω).
const OUTPUT_RESISTANCE: f64 = 10.0;

/// A switchable logic-level source.
#[derive(Debug, Clone)]
pub struct LogicInput {
    junction: NodeId,
    node: NodeId,
    volts: f64,
    current: f64,
    high: bool,
    hi_volts: f64,
    lo_volts: f64,
    branch: usize,
}

impl LogicInput {
    pub fn new(post: NodeId) -> Self {
        Self {
            junction: post,
            node: post,
            volts: 0.0,
            current: 0.0,
            high: false,
            hi_volts: HIGH_VOLTS,
            lo_volts: 0.0,
            branch: 0,
        }
    }

    pub fn high(post: NodeId) -> Self {
        Self {
            high: true,
            ..Self::new(post)
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn set_high(&mut self, high: bool) {
        self.high = high;
    }

    pub fn toggle(&mut self) {
        self.high = !self.high;
    }
}

impl Element for LogicInput {
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
        mna.stamp_voltage_source(self.node, NodeId::GROUND, self.branch, 0.0);
    }

    fn stamp_step(&mut self, mna: &mut MnaSystem, _iteration: &mut Iteration) {
        let volts = if self.high {
            self.hi_volts
        } else {
            self.lo_volts
        };
        mna.update_voltage_source(self.branch, volts);
    }

    fn set_voltage(&mut self, _post: usize, volts: f64) {
        self.volts = volts;
    }

    fn set_branch_current(&mut self, _n: usize, amps: f64) {
        // Positive current flows out of the input into the circuit.
        self.current = -amps;
    }

    fn current(&self) -> f64 {
        self.current
    }

    fn reset(&mut self) {
        self.volts = 0.0;
        self.current = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "logic input".into(),
            format!(
                "{} ({})",
                if self.high { "high" } else { "low" },
                format_unit(self.volts, "V")
            ),
            format!("I = {}", format_unit(self.current, "A")),
        ]
    }
}

/// A logic-level probe.
#[derive(Debug, Clone)]
pub struct LogicOutput {
    junction: NodeId,
    node: NodeId,
    volts: f64,
}

impl LogicOutput {
    pub fn new(post: NodeId) -> Self {
        Self {
            junction: post,
            node: post,
            volts: 0.0,
        }
    }

    pub fn voltage(&self) -> f64 {
        self.volts
    }

    pub fn is_high(&self) -> bool {
        self.volts > THRESHOLD
    }
}

impl Element for LogicOutput {
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

    fn set_voltage(&mut self, _post: usize, volts: f64) {
        self.volts = volts;
    }

    fn reset(&mut self) {
        self.volts = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "logic output".into(),
            (if self.is_high() { "high" } else { "low" }).into(),
            format!("V = {}", format_unit(self.volts, "V")),
        ]
    }
}

/// Gate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Or,
    Xor,
    Nand,
    Nor,
}

impl GateKind {
    fn evaluate(self, inputs: impl Iterator<Item = bool>) -> bool {
        let mut all = true;
        let mut any = false;
        let mut odd = false;
        for input in inputs {
            all &= input;
            any |= input;
            odd ^= input;
        }
        match self {
            GateKind::And => all,
            GateKind::Or => any,
            GateKind::Xor => odd,
            GateKind::Nand => !all,
            GateKind::Nor => !any,
        }
    }

    fn name(self) -> &'static str {
        match self {
            GateKind::And => "AND gate",
            GateKind::Or => "OR gate",
            GateKind::Xor => "XOR gate",
            GateKind::Nand => "NAND gate",
            GateKind::Nor => "NOR gate",
        }
    }
}

/// A logic gate with N inputs and one output (the last post).
#[derive(Debug, Clone)]
pub struct Gate {
    kind: GateKind,
    junctions: Vec<NodeId>,
    nodes: Vec<NodeId>,
    volts: Vec<f64>,
    /// Source node behind the output resistance.
    internal: NodeId,
    branch: usize,
    current: f64,
}

impl Gate {
    pub fn new(kind: GateKind, inputs: &[NodeId], output: NodeId) -> Self {
        assert!(!inputs.is_empty(), "a gate needs at least one input");
        let mut junctions = inputs.to_vec();
        junctions.push(output);
        Self {
            kind,
            nodes: junctions.clone(),
            volts: vec![0.0; junctions.len()],
            junctions,
            internal: NodeId::GROUND,
            branch: 0,
            current: 0.0,
        }
    }

    /// A logic inverter (single-input NAND).
    pub fn inverter(input: NodeId, output: NodeId) -> Self {
        Self::new(GateKind::Nand, &[input], output)
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    fn input_count(&self) -> usize {
        self.junctions.len() - 1
    }

    fn output_post(&self) -> usize {
        self.junctions.len() - 1
    }

    fn function(&self) -> bool {
        let threshold = THRESHOLD;
        self.kind
            .evaluate(self.volts[..self.input_count()].iter().map(|&v| v > threshold))
    }
}

impl Element for Gate {
    fn post_count(&self) -> usize {
        self.junctions.len()
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

    fn internal_node_count(&self) -> usize {
        1
    }

    fn set_internal_node(&mut self, _n: usize, node: NodeId) {
        self.internal = node;
    }

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn set_branch(&mut self, _n: usize, branch: usize) {
        self.branch = branch;
    }

    // No current path through the inputs; the output reaches ground
    // through the drive stage.
    fn connects(&self, _a: usize, _b: usize) -> bool {
        false
    }

    fn has_ground_connection(&self, post: usize) -> bool {
        post == self.output_post()
    }

    fn stamp(&mut self, mna: &mut MnaSystem, _ctx: &SimContext) {
        mna.stamp_voltage_source(self.internal, NodeId::GROUND, self.branch, 0.0);
        mna.stamp_resistor(
            self.internal,
            self.nodes[self.output_post()],
            OUTPUT_RESISTANCE,
        );
    }

    fn stamp_step(&mut self, mna: &mut MnaSystem, _iteration: &mut Iteration) {
        let volts = if self.function() { HIGH_VOLTS } else { 0.0 };
        mna.update_voltage_source(self.branch, volts);
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.volts[post] = volts;
    }

    fn set_branch_current(&mut self, _n: usize, amps: f64) {
        // Positive current flows out of the gate output.
        self.current = -amps;
    }

    fn current(&self) -> f64 {
        self.current
    }

    fn reset(&mut self) {
        self.volts.fill(0.0);
        self.current = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            self.kind.name().into(),
            format!(
                "Vout = {}",
                format_unit(self.volts[self.output_post()], "V")
            ),
            format!("Iout = {}", format_unit(self.current, "A")),
        ]
    }
}
