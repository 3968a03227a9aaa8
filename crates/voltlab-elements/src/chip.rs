//! Chips with numbered pins.
//!
//! [`Chip`] is the shared body for logic packages: a pin table where
//! each output pin drives its own ground-referenced voltage source
//! (one branch unknown per output), inputs are high-impedance senses,
//! and the package logic runs over boolean pin values. Concrete chips
//! compose a `Chip` and implement their function in `end_step`, so
//! registers latch exactly once per committed step.

use voltlab_core::units::format_unit;
use voltlab_core::{Element, Iteration, MnaSystem, NodeId, SimContext};

use crate::logic::{HIGH_VOLTS, THRESHOLD};

/// One pin of a chip.
#[derive(Debug, Clone)]
pub struct Pin {
    pub label: &'static str,
    pub output: bool,
    pub clock: bool,
    /// Boolean pin state: latched drive level for outputs, sampled
    /// level for inputs.
    pub value: bool,
    branch: usize,
    junction: NodeId,
    node: NodeId,
    volts: f64,
    current: f64,
}

impl Pin {
    pub fn input(label: &'static str, junction: NodeId) -> Self {
        Self {
            label,
            output: false,
            clock: false,
            value: false,
            branch: 0,
            junction,
            node: junction,
            volts: 0.0,
            current: 0.0,
        }
    }

    pub fn output(label: &'static str, junction: NodeId) -> Self {
        Self {
            output: true,
            ..Self::input(label, junction)
        }
    }

    pub fn clock(junction: NodeId) -> Self {
        Self {
            clock: true,
            ..Self::input("", junction)
        }
    }

    pub fn voltage(&self) -> f64 {
        self.volts
    }

    pub fn current(&self) -> f64 {
        self.current
    }
}

/// Shared body for multi-pin packages.
#[derive(Debug, Clone)]
pub struct Chip {
    pins: Vec<Pin>,
    pub last_clock: bool,
}

impl Chip {
    pub fn new(pins: Vec<Pin>) -> Self {
        Self {
            pins,
            last_clock: false,
        }
    }

    pub fn pin(&self, n: usize) -> &Pin {
        &self.pins[n]
    }

    pub fn pin_mut(&mut self, n: usize) -> &mut Pin {
        &mut self.pins[n]
    }

    pub fn add_pin(&mut self, pin: Pin) {
        self.pins.push(pin);
    }

    pub fn post_count(&self) -> usize {
        self.pins.len()
    }

    pub fn junction(&self, post: usize) -> NodeId {
        self.pins[post].junction
    }

    pub fn node(&self, post: usize) -> NodeId {
        self.pins[post].node
    }

    pub fn set_node(&mut self, post: usize, node: NodeId) {
        self.pins[post].node = node;
    }

    pub fn voltage_source_count(&self) -> usize {
        self.pins.iter().filter(|p| p.output).count()
    }

    pub fn set_branch(&mut self, n: usize, branch: usize) {
        if let Some(pin) = self.pins.iter_mut().filter(|p| p.output).nth(n) {
            pin.branch = branch;
        }
    }

    pub fn has_ground_connection(&self, post: usize) -> bool {
        self.pins[post].output
    }

    pub fn stamp(&mut self, mna: &mut MnaSystem) {
        for pin in self.pins.iter().filter(|p| p.output) {
            mna.stamp_voltage_source(pin.node, NodeId::GROUND, pin.branch, 0.0);
        }
    }

    pub fn stamp_step(&mut self, mna: &mut MnaSystem) {
        for pin in self.pins.iter().filter(|p| p.output) {
            let volts = if pin.value { HIGH_VOLTS } else { 0.0 };
            mna.update_voltage_source(pin.branch, volts);
        }
    }

    pub fn set_voltage(&mut self, post: usize, volts: f64) {
        self.pins[post].volts = volts;
    }

    pub fn set_branch_current(&mut self, n: usize, amps: f64) {
        if let Some(pin) = self.pins.iter_mut().filter(|p| p.output).nth(n) {
            pin.current = amps;
        }
    }

    /// Latch boolean levels for every input pin from the committed
    /// voltages.
    pub fn sample_inputs(&mut self) {
        for pin in self.pins.iter_mut().filter(|p| !p.output) {
            pin.value = pin.volts > THRESHOLD;
        }
    }

    pub fn reset(&mut self) {
        for pin in &mut self.pins {
            pin.volts = 0.0;
            pin.current = 0.0;
            pin.value = false;
        }
        self.last_clock = false;
    }
}

/// An edge-triggered D flip-flop.
///
/// Pins: 0 = D, 1 = Q, 2 = Q̄, 3 = clock, optionally 4 = async reset.
/// The register latches on the rising clock edge of a committed step;
/// the new output level drives the circuit from the following step.
#[derive(Debug, Clone)]
pub struct DFlipFlop {
    chip: Chip,
    has_reset: bool,
}

impl DFlipFlop {
    const D: usize = 0;
    const Q: usize = 1;
    const QBAR: usize = 2;
    const CLK: usize = 3;
    const RESET: usize = 4;

    pub fn new(d: NodeId, q: NodeId, qbar: NodeId, clk: NodeId) -> Self {
        let mut chip = Chip::new(vec![
            Pin::input("D", d),
            Pin::output("Q", q),
            Pin::output("Q'", qbar),
            Pin::clock(clk),
        ]);
        chip.pin_mut(Self::QBAR).value = true;
        Self {
            chip,
            has_reset: false,
        }
    }

    pub fn with_reset(d: NodeId, q: NodeId, qbar: NodeId, clk: NodeId, reset: NodeId) -> Self {
        let mut ff = Self::new(d, q, qbar, clk);
        ff.chip.add_pin(Pin::input("R", reset));
        ff.has_reset = true;
        ff
    }

    pub fn q(&self) -> bool {
        self.chip.pin(Self::Q).value
    }
}

impl Element for DFlipFlop {
    fn post_count(&self) -> usize {
        self.chip.post_count()
    }

    fn junction(&self, post: usize) -> NodeId {
        self.chip.junction(post)
    }

    fn post_node(&self, post: usize) -> NodeId {
        self.chip.node(post)
    }

    fn set_post_node(&mut self, post: usize, node: NodeId) {
        self.chip.set_node(post, node);
    }

    fn voltage_source_count(&self) -> usize {
        self.chip.voltage_source_count()
    }

    fn set_branch(&mut self, n: usize, branch: usize) {
        self.chip.set_branch(n, branch);
    }

    fn connects(&self, _a: usize, _b: usize) -> bool {
        false
    }

    fn has_ground_connection(&self, post: usize) -> bool {
        self.chip.has_ground_connection(post)
    }

    fn stamp(&mut self, mna: &mut MnaSystem, _ctx: &SimContext) {
        self.chip.stamp(mna);
    }

    fn stamp_step(&mut self, mna: &mut MnaSystem, _iteration: &mut Iteration) {
        self.chip.stamp_step(mna);
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.chip.set_voltage(post, volts);
    }

    fn set_branch_current(&mut self, n: usize, amps: f64) {
        self.chip.set_branch_current(n, amps);
    }

    fn end_step(&mut self, _ctx: &SimContext) {
        self.chip.sample_inputs();
        let clk = self.chip.pin(Self::CLK).value;
        if clk && !self.chip.last_clock {
            let d = self.chip.pin(Self::D).value;
            self.chip.pin_mut(Self::Q).value = d;
            self.chip.pin_mut(Self::QBAR).value = !d;
        }
        if self.has_reset && self.chip.pin(Self::RESET).value {
            self.chip.pin_mut(Self::Q).value = false;
            self.chip.pin_mut(Self::QBAR).value = true;
        }
        self.chip.last_clock = clk;
    }

    fn reset(&mut self) {
        self.chip.reset();
        self.chip.pin_mut(Self::QBAR).value = true;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "D flip-flop".into(),
            format!("Q = {}", if self.q() { "high" } else { "low" }),
            format!(
                "Vq = {}",
                format_unit(self.chip.pin(Self::Q).voltage(), "V")
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SimContext {
        SimContext {
            time: 0.0,
            time_step: 1e-6,
        }
    }

    fn set_level(ff: &mut DFlipFlop, post: usize, high: bool) {
        ff.set_voltage(post, if high { 5.0 } else { 0.0 });
    }

    #[test]
    fn test_latches_on_rising_edge() {
        let mut ff = DFlipFlop::new(
            NodeId::new(1),
            NodeId::new(2),
            NodeId::new(3),
            NodeId::new(4),
        );
        assert!(!ff.q());

        // D high, clock low: nothing happens.
        set_level(&mut ff, DFlipFlop::D, true);
        set_level(&mut ff, DFlipFlop::CLK, false);
        ff.end_step(&ctx());
        assert!(!ff.q());

        // Rising edge: D is captured.
        set_level(&mut ff, DFlipFlop::CLK, true);
        ff.end_step(&ctx());
        assert!(ff.q());

        // D drops while the clock stays high: no change.
        set_level(&mut ff, DFlipFlop::D, false);
        ff.end_step(&ctx());
        assert!(ff.q());
    }

    #[test]
    fn test_async_reset_overrides() {
        let mut ff = DFlipFlop::with_reset(
            NodeId::new(1),
            NodeId::new(2),
            NodeId::new(3),
            NodeId::new(4),
            NodeId::new(5),
        );
        set_level(&mut ff, DFlipFlop::D, true);
        set_level(&mut ff, DFlipFlop::CLK, true);
        ff.end_step(&ctx());
        assert!(ff.q());

        set_level(&mut ff, DFlipFlop::RESET, true);
        ff.end_step(&ctx());
        assert!(!ff.q());
        assert!(ff.chip.pin(DFlipFlop::QBAR).value);
    }
}
