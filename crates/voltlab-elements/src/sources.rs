//! Independent sources and their drive waveforms.

use std::f64::consts::{PI, TAU};

use voltlab_core::units::format_unit;
use voltlab_core::{Element, Iteration, MnaSystem, NodeId, SimContext};

use crate::body::TwoTerminal;

/// Waveform shape of a time-varying source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Dc,
    Sine,
    Square,
    Triangle,
    Sawtooth,
    Pulse,
}

/// A closed-form drive waveform evaluated at simulated time.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub shape: Shape,
    /// Peak value relative to the bias (V or A).
    pub amplitude: f64,
    /// Frequency (Hz); ignored for DC.
    pub frequency: f64,
    /// DC offset added to every shape.
    pub bias: f64,
    /// Phase shift (radians).
    pub phase: f64,
    /// High fraction of the period; squares and pulses only.
    pub duty_cycle: f64,
}

impl Waveform {
    pub fn dc(value: f64) -> Self {
        Self {
            shape: Shape::Dc,
            amplitude: value,
            frequency: 0.0,
            bias: 0.0,
            phase: 0.0,
            duty_cycle: 0.5,
        }
    }

    pub fn sine(amplitude: f64, frequency: f64) -> Self {
        Self {
            shape: Shape::Sine,
            amplitude,
            frequency,
            bias: 0.0,
            phase: 0.0,
            duty_cycle: 0.5,
        }
    }

    pub fn square(amplitude: f64, frequency: f64) -> Self {
        Self {
            shape: Shape::Square,
            amplitude,
            frequency,
            bias: 0.0,
            phase: 0.0,
            duty_cycle: 0.5,
        }
    }

    pub fn triangle(amplitude: f64, frequency: f64) -> Self {
        Self {
            shape: Shape::Triangle,
            amplitude,
            frequency,
            bias: 0.0,
            phase: 0.0,
            duty_cycle: 0.5,
        }
    }

    pub fn sawtooth(amplitude: f64, frequency: f64) -> Self {
        Self {
            shape: Shape::Sawtooth,
            amplitude,
            frequency,
            bias: 0.0,
            phase: 0.0,
            duty_cycle: 0.5,
        }
    }

    pub fn pulse(amplitude: f64, frequency: f64, duty_cycle: f64) -> Self {
        Self {
            shape: Shape::Pulse,
            amplitude,
            frequency,
            bias: 0.0,
            phase: 0.0,
            duty_cycle,
        }
    }

    /// A 0..5 V logic clock.
    pub fn clock(frequency: f64) -> Self {
        Self {
            shape: Shape::Square,
            amplitude: 2.5,
            frequency,
            bias: 2.5,
            phase: 0.0,
            duty_cycle: 0.5,
        }
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    /// True if the value never changes, so the source can be stamped
    /// once into the fixed part.
    pub fn is_constant(&self) -> bool {
        self.shape == Shape::Dc
    }

    /// Evaluate the waveform at time `t` (s).
    pub fn value(&self, t: f64) -> f64 {
        let w = (TAU * self.frequency * t + self.phase).rem_euclid(TAU);
        match self.shape {
            Shape::Dc => self.amplitude + self.bias,
            Shape::Sine => self.bias + w.sin() * self.amplitude,
            Shape::Square => {
                if w < TAU * self.duty_cycle {
                    self.bias + self.amplitude
                } else {
                    self.bias - self.amplitude
                }
            }
            Shape::Triangle => {
                let tri = if w < PI {
                    w * (2.0 / PI) - 1.0
                } else {
                    1.0 - (w - PI) * (2.0 / PI)
                };
                self.bias + tri * self.amplitude
            }
            Shape::Sawtooth => self.bias + w * (self.amplitude / PI) - self.amplitude,
            Shape::Pulse => {
                if w < TAU * self.duty_cycle {
                    self.bias + self.amplitude
                } else {
                    self.bias
                }
            }
        }
    }
}

/// An independent voltage source between two posts.
///
/// Post 0 is the positive terminal. Constant sources are stamped once
/// into the fixed part; time-varying ones stamp a changeable source and
/// rewrite its RHS row every sub-iteration.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    body: TwoTerminal,
    waveform: Waveform,
    branch: usize,
    value: f64,
}

impl VoltageSource {
    pub fn new(pos: NodeId, neg: NodeId, waveform: Waveform) -> Self {
        Self {
            body: TwoTerminal::new(pos, neg),
            waveform,
            branch: 0,
            value: 0.0,
        }
    }

    /// A DC source.
    pub fn dc(pos: NodeId, neg: NodeId, volts: f64) -> Self {
        Self::new(pos, neg, Waveform::dc(volts))
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }
}

impl Element for VoltageSource {
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

    fn voltage_source_count(&self) -> usize {
        1
    }

    fn set_branch(&mut self, _n: usize, branch: usize) {
        self.branch = branch;
    }

    fn stamp(&mut self, mna: &mut MnaSystem, ctx: &SimContext) {
        let volts = if self.waveform.is_constant() {
            self.waveform.value(ctx.time)
        } else {
            0.0
        };
        mna.stamp_voltage_source(self.body.node(0), self.body.node(1), self.branch, volts);
    }

    fn begin_step(&mut self, ctx: &SimContext) {
        // The solve targets the end of the step; evaluating there keeps
        // the trapezoidal companion second-order.
        self.value = self.waveform.value(ctx.time + ctx.time_step);
    }

    fn stamp_step(&mut self, mna: &mut MnaSystem, _iteration: &mut Iteration) {
        if !self.waveform.is_constant() {
            mna.update_voltage_source(self.branch, self.value);
        }
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.body.set_voltage(post, volts);
    }

    fn set_branch_current(&mut self, _n: usize, amps: f64) {
        self.body.set_current(amps);
    }

    fn current(&self) -> f64 {
        self.body.current()
    }

    fn reset(&mut self) {
        self.body.reset();
        self.value = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "voltage source".into(),
            format!("V = {}", format_unit(self.body.voltage_diff(), "V")),
            format!("I = {}", format_unit(self.body.current(), "A")),
        ]
    }
}

/// A one-post voltage rail referenced to ground.
#[derive(Debug, Clone)]
pub struct Rail {
    junction: NodeId,
    node: NodeId,
    volts: f64,
    current: f64,
    waveform: Waveform,
    branch: usize,
    value: f64,
}

impl Rail {
    pub fn new(post: NodeId, waveform: Waveform) -> Self {
        Self {
            junction: post,
            node: post,
            volts: 0.0,
            current: 0.0,
            waveform,
            branch: 0,
            value: 0.0,
        }
    }

    /// A DC supply rail.
    pub fn dc(post: NodeId, volts: f64) -> Self {
        Self::new(post, Waveform::dc(volts))
    }

    /// A 0..5 V clock rail.
    pub fn clock(post: NodeId, frequency: f64) -> Self {
        Self::new(post, Waveform::clock(frequency))
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }
}

impl Element for Rail {
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

    fn stamp(&mut self, mna: &mut MnaSystem, ctx: &SimContext) {
        let volts = if self.waveform.is_constant() {
            self.waveform.value(ctx.time)
        } else {
            0.0
        };
        mna.stamp_voltage_source(self.node, NodeId::GROUND, self.branch, volts);
    }

    fn begin_step(&mut self, ctx: &SimContext) {
        // The solve targets the end of the step; evaluating there keeps
        // the trapezoidal companion second-order.
        self.value = self.waveform.value(ctx.time + ctx.time_step);
    }

    fn stamp_step(&mut self, mna: &mut MnaSystem, _iteration: &mut Iteration) {
        if !self.waveform.is_constant() {
            mna.update_voltage_source(self.branch, self.value);
        }
    }

    fn set_voltage(&mut self, _post: usize, volts: f64) {
        self.volts = volts;
    }

    fn set_branch_current(&mut self, _n: usize, amps: f64) {
        self.current = amps;
    }

    fn current(&self) -> f64 {
        self.current
    }

    fn reset(&mut self) {
        self.volts = 0.0;
        self.current = 0.0;
        self.value = 0.0;
    }

    fn info(&self) -> Vec<String> {
        vec![
            "voltage rail".into(),
            format!("V = {}", format_unit(self.volts, "V")),
            format!("I = {}", format_unit(self.current, "A")),
        ]
    }
}

/// An independent current source driving a fixed current from post 0 to
/// post 1 through itself.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    body: TwoTerminal,
    amps: f64,
}

impl CurrentSource {
    pub fn new(a: NodeId, b: NodeId, amps: f64) -> Self {
        Self {
            body: TwoTerminal::new(a, b),
            amps,
        }
    }

    pub fn set_current_value(&mut self, amps: f64) {
        self.amps = amps;
    }
}

impl Element for CurrentSource {
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
        self.body.set_current(self.amps);
        mna.stamp_current_source(self.body.node(0), self.body.node(1), self.amps);
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.body.set_voltage(post, volts);
    }

    fn current(&self) -> f64 {
        self.body.current()
    }

    fn reset(&mut self) {
        self.body.reset();
    }

    fn info(&self) -> Vec<String> {
        vec![
            "current source".into(),
            format!("I = {}", format_unit(self.amps, "A")),
        ]
    }
}
