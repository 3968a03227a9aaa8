//! Passive elements: resistor, capacitor, inductor.
//!
//! The reactive elements use Norton-equivalent companion models: a
//! resistance stamped into the fixed matrix (it depends only on the
//! element value and the time step) and a current source refreshed once
//! per step from the element's committed voltage and current, then
//! stamped into the RHS every sub-iteration.

use voltlab_core::units::format_unit;
use voltlab_core::{Element, Iteration, MnaSystem, NodeId, SimContext};

use crate::body::TwoTerminal;

/// Companion-model integration method, selectable per element.
///
/// Trapezoidal is more accurate but can ring when the element's time
/// constant is small relative to the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Integration {
    BackwardEuler,
    #[default]
    Trapezoidal,
}

/// A resistor.
#[derive(Debug, Clone)]
pub struct Resistor {
    body: TwoTerminal,
    resistance: f64,
}

impl Resistor {
    pub fn new(a: NodeId, b: NodeId, ohms: f64) -> Self {
        let mut r = Self {
            body: TwoTerminal::new(a, b),
            resistance: 1000.0,
        };
        r.set_resistance(ohms);
        r
    }

    pub fn resistance(&self) -> f64 {
        self.resistance
    }

    /// Non-positive values are rejected; the previous value stays.
    pub fn set_resistance(&mut self, ohms: f64) {
        if ohms > 0.0 {
            self.resistance = ohms;
        }
    }
}

impl Element for Resistor {
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

    fn stamp(&mut self, mna: &mut MnaSystem, _ctx: &SimContext) {
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

    fn reset(&mut self) {
        self.body.reset();
    }

    fn info(&self) -> Vec<String> {
        vec![
            "resistor".into(),
            format!("R = {}", format_unit(self.resistance, "Ω")),
            format!("I = {}", format_unit(self.body.current(), "A")),
            format!("Vd = {}", format_unit(self.body.voltage_diff(), "V")),
        ]
    }
}

/// A capacitor.
#[derive(Debug, Clone)]
pub struct Capacitor {
    body: TwoTerminal,
    capacitance: f64,
    integration: Integration,
    comp_resistance: f64,
    /// Committed voltage across the plates.
    volt_diff: f64,
    cur_source: f64,
}

impl Capacitor {
    pub fn new(a: NodeId, b: NodeId, farads: f64) -> Self {
        let mut c = Self {
            body: TwoTerminal::new(a, b),
            capacitance: 1e-5,
            integration: Integration::default(),
            comp_resistance: 0.0,
            volt_diff: 0.0,
            cur_source: 0.0,
        };
        c.set_capacitance(farads);
        c
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.integration = integration;
        self
    }

    pub fn capacitance(&self) -> f64 {
        self.capacitance
    }

    pub fn set_capacitance(&mut self, farads: f64) {
        if farads > 0.0 {
            self.capacitance = farads;
        }
    }

    pub fn set_integration(&mut self, integration: Integration) {
        self.integration = integration;
    }
}

impl Element for Capacitor {
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

    fn stamp(&mut self, mna: &mut MnaSystem, ctx: &SimContext) {
        self.comp_resistance = match self.integration {
            Integration::Trapezoidal => ctx.time_step / (2.0 * self.capacitance),
            Integration::BackwardEuler => ctx.time_step / self.capacitance,
        };
        mna.stamp_resistor(self.body.node(0), self.body.node(1), self.comp_resistance);
    }

    fn begin_step(&mut self, _ctx: &SimContext) {
        self.cur_source = match self.integration {
            Integration::Trapezoidal => {
                -self.volt_diff / self.comp_resistance - self.body.current()
            }
            Integration::BackwardEuler => -self.volt_diff / self.comp_resistance,
        };
    }

    fn stamp_step(&mut self, mna: &mut MnaSystem, _iteration: &mut Iteration) {
        mna.stamp_current_source(self.body.node(0), self.body.node(1), self.cur_source);
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.body.set_voltage(post, volts);
    }

    fn update_current(&mut self) {
        // Guarded: a current readback before the first stamp would
        // divide by zero.
        if self.comp_resistance > 0.0 {
            let amps = self.body.voltage_diff() / self.comp_resistance + self.cur_source;
            self.body.set_current(amps);
        }
    }

    fn current(&self) -> f64 {
        self.body.current()
    }

    fn end_step(&mut self, _ctx: &SimContext) {
        self.volt_diff = self.body.voltage_diff();
    }

    fn reset(&mut self) {
        self.body.reset();
        self.cur_source = 0.0;
        // A small residual charge so relaxation oscillators start.
        self.volt_diff = 1e-3;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "capacitor".into(),
            format!("C = {}", format_unit(self.capacitance, "F")),
            format!("I = {}", format_unit(self.body.current(), "A")),
            format!("Vd = {}", format_unit(self.body.voltage_diff(), "V")),
        ]
    }
}

/// An inductor.
#[derive(Debug, Clone)]
pub struct Inductor {
    body: TwoTerminal,
    inductance: f64,
    integration: Integration,
    comp_resistance: f64,
    /// Committed voltage across the winding.
    volt_diff: f64,
    cur_source: f64,
}

impl Inductor {
    pub fn new(a: NodeId, b: NodeId, henries: f64) -> Self {
        let mut l = Self {
            body: TwoTerminal::new(a, b),
            inductance: 1.0,
            integration: Integration::default(),
            comp_resistance: 0.0,
            volt_diff: 0.0,
            cur_source: 0.0,
        };
        l.set_inductance(henries);
        l
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.integration = integration;
        self
    }

    pub fn inductance(&self) -> f64 {
        self.inductance
    }

    pub fn set_inductance(&mut self, henries: f64) {
        if henries > 0.0 {
            self.inductance = henries;
        }
    }

    pub fn set_integration(&mut self, integration: Integration) {
        self.integration = integration;
    }
}

impl Element for Inductor {
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

    fn stamp(&mut self, mna: &mut MnaSystem, ctx: &SimContext) {
        self.comp_resistance = match self.integration {
            Integration::Trapezoidal => 2.0 * self.inductance / ctx.time_step,
            Integration::BackwardEuler => self.inductance / ctx.time_step,
        };
        mna.stamp_resistor(self.body.node(0), self.body.node(1), self.comp_resistance);
    }

    fn begin_step(&mut self, _ctx: &SimContext) {
        self.cur_source = match self.integration {
            Integration::Trapezoidal => {
                self.volt_diff / self.comp_resistance + self.body.current()
            }
            Integration::BackwardEuler => self.body.current(),
        };
    }

    fn stamp_step(&mut self, mna: &mut MnaSystem, _iteration: &mut Iteration) {
        mna.stamp_current_source(self.body.node(0), self.body.node(1), self.cur_source);
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.body.set_voltage(post, volts);
    }

    fn update_current(&mut self) {
        if self.comp_resistance > 0.0 {
            let amps = self.body.voltage_diff() / self.comp_resistance + self.cur_source;
            self.body.set_current(amps);
        }
    }

    fn current(&self) -> f64 {
        self.body.current()
    }

    fn end_step(&mut self, _ctx: &SimContext) {
        self.volt_diff = self.body.voltage_diff();
    }

    fn reset(&mut self) {
        self.body.reset();
        self.cur_source = 0.0;
        self.volt_diff = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "inductor".into(),
            format!("L = {}", format_unit(self.inductance, "H")),
            format!("I = {}", format_unit(self.body.current(), "A")),
        ]
    }
}
