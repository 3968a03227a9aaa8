//! Linear dopant-drift memristor.

use voltlab_core::units::format_unit;
use voltlab_core::{Element, Iteration, MnaSystem, NodeId, SimContext};

use crate::body::TwoTerminal;

/// A memristor with the linear dopant-drift model: resistance
/// interpolates between `r_on` and `r_off` as the doped region sweeps
/// across the device. The doping width advances from the committed
/// current when a step commits, so sub-iterations see a constant
/// resistance.
#[derive(Debug, Clone)]
pub struct Memristor {
    body: TwoTerminal,
    r_on: f64,
    r_off: f64,
    dope_width: f64,
    total_width: f64,
    /// Dopant mobility (m²/sV).
    mobility: f64,
    resistance: f64,
}

impl Memristor {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        let r_on = 100.0;
        Self {
            body: TwoTerminal::new(a, b),
            r_on,
            r_off: 160.0 * r_on,
            dope_width: 0.0,
            total_width: 10e-9,
            mobility: 1e-10,
            resistance: 100.0,
        }
    }

    pub fn with_resistances(mut self, r_on: f64, r_off: f64) -> Self {
        if r_on > 0.0 && r_off > r_on {
            self.r_on = r_on;
            self.r_off = r_off;
        }
        self
    }

    pub fn resistance(&self) -> f64 {
        self.resistance
    }

    pub fn dope_fraction(&self) -> f64 {
        self.dope_width / self.total_width
    }
}

impl Element for Memristor {
    fn post_count(&self) -> usize {
        2
    }

    fn junction(&self, post: usize) -> NodeId {
        self.body.junction(post)
    }

    fn post_node(&self, post: usize) -> NodeId {
        self.body.node(post)
    }

    fn set_post_node(&mut self, post: usize, node: NodeId) {
        self.body.set_node(post, node);
    }

    fn nonlinear(&self) -> bool {
        true
    }

    fn begin_step(&mut self, _ctx: &SimContext) {
        let wd = self.dope_width / self.total_width;
        self.resistance = self.r_on * wd + self.r_off * (1.0 - wd);
    }

    fn stamp_step(&mut self, mna: &mut MnaSystem, _iteration: &mut Iteration) {
        mna.stamp_resistor(self.body.node(0), self.body.node(1), self.resistance);
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.body.set_voltage(post, volts);
    }

    fn update_current(&mut self) {
        let amps = self.body.voltage_diff() / self.resistance;
        self.body.set_current(amps);
    }

    fn current(&self) -> f64 {
        self.body.current()
    }

    fn end_step(&mut self, ctx: &SimContext) {
        self.dope_width += ctx.time_step * self.mobility * self.r_on * self.body.current()
            / self.total_width;
        self.dope_width = self.dope_width.clamp(0.0, self.total_width);
    }

    fn reset(&mut self) {
        self.body.reset();
        self.dope_width = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "memristor".into(),
            format!("R = {}", format_unit(self.resistance, "Ω")),
            format!("I = {}", format_unit(self.body.current(), "A")),
        ]
    }
}
