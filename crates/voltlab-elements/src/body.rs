//! Shared element bodies.
//!
//! Elements compose these helpers instead of inheriting a base class:
//! a [`PinSet`] owns the junction wiring, the registry-assigned nodes
//! and the solved voltages for N posts, and [`TwoTerminal`] adds the
//! reported current for the common two-post case.

use voltlab_core::NodeId;

/// Wiring, node assignment and solved voltages for `N` posts.
#[derive(Debug, Clone)]
pub struct PinSet<const N: usize> {
    junctions: [NodeId; N],
    nodes: [NodeId; N],
    volts: [f64; N],
}

impl<const N: usize> PinSet<N> {
    pub fn new(junctions: [NodeId; N]) -> Self {
        Self {
            junctions,
            nodes: junctions,
            volts: [0.0; N],
        }
    }

    pub fn junction(&self, post: usize) -> NodeId {
        self.junctions[post]
    }

    pub fn node(&self, post: usize) -> NodeId {
        self.nodes[post]
    }

    pub fn set_node(&mut self, post: usize, node: NodeId) {
        self.nodes[post] = node;
    }

    pub fn voltage(&self, post: usize) -> f64 {
        self.volts[post]
    }

    pub fn set_voltage(&mut self, post: usize, volts: f64) {
        self.volts[post] = volts;
    }

    pub fn clear_voltages(&mut self) {
        self.volts = [0.0; N];
    }
}

/// The common two-post body: pins plus a reported current.
#[derive(Debug, Clone)]
pub struct TwoTerminal {
    pins: PinSet<2>,
    current: f64,
}

impl TwoTerminal {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self {
            pins: PinSet::new([a, b]),
            current: 0.0,
        }
    }

    pub fn junction(&self, post: usize) -> NodeId {
        self.pins.junction(post)
    }

    pub fn node(&self, post: usize) -> NodeId {
        self.pins.node(post)
    }

    pub fn set_node(&mut self, post: usize, node: NodeId) {
        self.pins.set_node(post, node);
    }

    pub fn voltage(&self, post: usize) -> f64 {
        self.pins.voltage(post)
    }

    pub fn set_voltage(&mut self, post: usize, volts: f64) {
        self.pins.set_voltage(post, volts);
    }

    /// Voltage across the element, post 0 minus post 1.
    pub fn voltage_diff(&self) -> f64 {
        self.pins.voltage(0) - self.pins.voltage(1)
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn set_current(&mut self, amps: f64) {
        self.current = amps;
    }

    pub fn reset(&mut self) {
        self.pins.clear_voltages();
        self.current = 0.0;
    }
}
