//! Dependent sources: VCVS, VCCS, CCCS.
//!
//! All are four-post elements: posts 0/1 are the output pair, posts 2/3
//! the control pair. The CCCS senses its control current through an
//! internal 0 V source across posts 2/3.

use voltlab_core::units::format_unit;
use voltlab_core::{Element, MnaSystem, NodeId, SimContext};

use crate::body::PinSet;

/// Voltage-controlled voltage source:
/// `V(out) = gain * V(ctrl)`.
#[derive(Debug, Clone)]
pub struct Vcvs {
    pins: PinSet<4>,
    gain: f64,
    branch: usize,
    current: f64,
}

impl Vcvs {
    pub fn new(
        out_pos: NodeId,
        out_neg: NodeId,
        ctrl_pos: NodeId,
        ctrl_neg: NodeId,
        gain: f64,
    ) -> Self {
        Self {
            pins: PinSet::new([out_pos, out_neg, ctrl_pos, ctrl_neg]),
            gain,
            branch: 0,
            current: 0.0,
        }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f64) {
        self.gain = gain;
    }
}

impl Element for Vcvs {
    fn post_count(&self) -> usize {
        4
    }

    fn junction(&self, post: usize) -> NodeId {
        self.pins.junction(post)
    }

    fn post_node(&self, post: usize) -> NodeId {
        self.pins.node(post)
    }

    fn set_post_node(&mut self, post: usize, node: NodeId) {
        self.pins.set_node(post, node);
    }

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn set_branch(&mut self, _n: usize, branch: usize) {
        self.branch = branch;
    }

    fn connects(&self, a: usize, b: usize) -> bool {
        // Output pair conducts through the source; the control pair is
        // a high-impedance sense.
        (a, b) == (0, 1) || (a, b) == (1, 0)
    }

    fn stamp(&mut self, mna: &mut MnaSystem, _ctx: &SimContext) {
        mna.stamp_vcvs(
            self.pins.node(0),
            self.pins.node(1),
            self.pins.node(2),
            self.pins.node(3),
            self.gain,
            self.branch,
        );
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.pins.set_voltage(post, volts);
    }

    fn set_branch_current(&mut self, _n: usize, amps: f64) {
        self.current = amps;
    }

    fn current(&self) -> f64 {
        self.current
    }

    fn reset(&mut self) {
        self.pins.clear_voltages();
        self.current = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "VCVS".into(),
            format!("gain = {}", self.gain),
            format!("I = {}", format_unit(self.current, "A")),
        ]
    }
}

/// Voltage-controlled current source:
/// `I(out_pos -> out_neg) = gm * V(ctrl)`.
#[derive(Debug, Clone)]
pub struct Vccs {
    pins: PinSet<4>,
    gm: f64,
    current: f64,
}

impl Vccs {
    pub fn new(
        out_pos: NodeId,
        out_neg: NodeId,
        ctrl_pos: NodeId,
        ctrl_neg: NodeId,
        gm: f64,
    ) -> Self {
        Self {
            pins: PinSet::new([out_pos, out_neg, ctrl_pos, ctrl_neg]),
            gm,
            current: 0.0,
        }
    }

    pub fn transconductance(&self) -> f64 {
        self.gm
    }
}

impl Element for Vccs {
    fn post_count(&self) -> usize {
        4
    }

    fn junction(&self, post: usize) -> NodeId {
        self.pins.junction(post)
    }

    fn post_node(&self, post: usize) -> NodeId {
        self.pins.node(post)
    }

    fn set_post_node(&mut self, post: usize, node: NodeId) {
        self.pins.set_node(post, node);
    }

    fn connects(&self, a: usize, b: usize) -> bool {
        (a, b) == (0, 1) || (a, b) == (1, 0)
    }

    fn stamp(&mut self, mna: &mut MnaSystem, _ctx: &SimContext) {
        mna.stamp_vccs(
            self.pins.node(0),
            self.pins.node(1),
            self.pins.node(2),
            self.pins.node(3),
            self.gm,
        );
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.pins.set_voltage(post, volts);
    }

    fn update_current(&mut self) {
        self.current = self.gm * (self.pins.voltage(2) - self.pins.voltage(3));
    }

    fn current(&self) -> f64 {
        self.current
    }

    fn reset(&mut self) {
        self.pins.clear_voltages();
        self.current = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "VCCS".into(),
            format!("gm = {}", format_unit(self.gm, "S")),
            format!("I = {}", format_unit(self.current, "A")),
        ]
    }
}

/// Current-controlled current source:
/// `I(out_pos -> out_neg) = gain * I(ctrl)`, control current sensed
/// through an internal 0 V source between posts 2 and 3.
#[derive(Debug, Clone)]
pub struct Cccs {
    pins: PinSet<4>,
    gain: f64,
    branch: usize,
    ctrl_current: f64,
}

impl Cccs {
    pub fn new(
        out_pos: NodeId,
        out_neg: NodeId,
        ctrl_in: NodeId,
        ctrl_out: NodeId,
        gain: f64,
    ) -> Self {
        Self {
            pins: PinSet::new([out_pos, out_neg, ctrl_in, ctrl_out]),
            gain,
            branch: 0,
            ctrl_current: 0.0,
        }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// The sensed control current.
    pub fn control_current(&self) -> f64 {
        self.ctrl_current
    }
}

impl Element for Cccs {
    fn post_count(&self) -> usize {
        4
    }

    fn junction(&self, post: usize) -> NodeId {
        self.pins.junction(post)
    }

    fn post_node(&self, post: usize) -> NodeId {
        self.pins.node(post)
    }

    fn set_post_node(&mut self, post: usize, node: NodeId) {
        self.pins.set_node(post, node);
    }

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn set_branch(&mut self, _n: usize, branch: usize) {
        self.branch = branch;
    }

    fn connects(&self, a: usize, b: usize) -> bool {
        // The sense pair is a dead short; the output pair conducts.
        matches!((a, b), (0, 1) | (1, 0) | (2, 3) | (3, 2))
    }

    fn stamp(&mut self, mna: &mut MnaSystem, _ctx: &SimContext) {
        mna.stamp_voltage_source(self.pins.node(2), self.pins.node(3), self.branch, 0.0);
        mna.stamp_cccs(self.pins.node(0), self.pins.node(1), self.branch, self.gain);
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.pins.set_voltage(post, volts);
    }

    fn set_branch_current(&mut self, _n: usize, amps: f64) {
        self.ctrl_current = amps;
    }

    fn current(&self) -> f64 {
        self.gain * self.ctrl_current
    }

    fn reset(&mut self) {
        self.pins.clear_voltages();
        self.ctrl_current = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "CCCS".into(),
            format!("gain = {}", self.gain),
            format!("I = {}", format_unit(self.current(), "A")),
        ]
    }
}
