//! Wires, grounds and switches.
//!
//! These elements contribute connectivity, not stamps: the node
//! registry collapses their short-circuited posts into a single node,
//! so a wire or a closed switch never appears in the matrix at all.
//! A merged short carries no branch unknown and therefore reports no
//! independent current.

use voltlab_core::{Element, MnaSystem, NodeId, SimContext};

use crate::body::TwoTerminal;

/// An ideal wire: both posts are always the same node.
#[derive(Debug, Clone)]
pub struct Wire {
    body: TwoTerminal,
}

impl Wire {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self {
            body: TwoTerminal::new(a, b),
        }
    }
}

impl Element for Wire {
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

    fn shorted(&self, _a: usize, _b: usize) -> bool {
        true
    }

    fn stamp(&mut self, _mna: &mut MnaSystem, _ctx: &SimContext) {}

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.body.set_voltage(post, volts);
    }

    fn reset(&mut self) {
        self.body.reset();
    }

    fn info(&self) -> Vec<String> {
        vec!["wire".into()]
    }
}

/// The ground reference symbol.
#[derive(Debug, Clone)]
pub struct Ground {
    junction: NodeId,
    node: NodeId,
}

impl Ground {
    pub fn new(post: NodeId) -> Self {
        Self {
            junction: post,
            node: post,
        }
    }
}

impl Element for Ground {
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

    fn is_ground_post(&self, _post: usize) -> bool {
        true
    }

    fn has_ground_connection(&self, _post: usize) -> bool {
        true
    }

    fn set_voltage(&mut self, _post: usize, _volts: f64) {}

    fn reset(&mut self) {}

    fn info(&self) -> Vec<String> {
        vec!["ground".into()]
    }
}

/// An SPST switch.
///
/// Closed, it is wire-equivalent and its posts merge; open, it leaves a
/// gap. Toggling changes the node map, so the host must invalidate the
/// topology afterwards.
#[derive(Debug, Clone)]
pub struct Switch {
    body: TwoTerminal,
    closed: bool,
    momentary: bool,
}

impl Switch {
    /// A toggle switch, initially closed.
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self {
            body: TwoTerminal::new(a, b),
            closed: true,
            momentary: false,
        }
    }

    /// A toggle switch, initially open.
    pub fn open(a: NodeId, b: NodeId) -> Self {
        Self {
            closed: false,
            ..Self::new(a, b)
        }
    }

    /// A momentary push switch, open until pressed.
    pub fn momentary(a: NodeId, b: NodeId) -> Self {
        Self {
            closed: false,
            momentary: true,
            ..Self::new(a, b)
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_momentary(&self) -> bool {
        self.momentary
    }

    pub fn toggle(&mut self) {
        self.closed = !self.closed;
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }
}

impl Element for Switch {
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

    fn shorted(&self, _a: usize, _b: usize) -> bool {
        self.closed
    }

    fn connects(&self, _a: usize, _b: usize) -> bool {
        self.closed
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.body.set_voltage(post, volts);
    }

    fn reset(&mut self) {
        self.body.reset();
    }

    fn info(&self) -> Vec<String> {
        let state = if self.closed { "closed" } else { "open" };
        vec![
            if self.momentary {
                "push switch (SPST)".into()
            } else {
                "switch (SPST)".into()
            },
            state.into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_connectivity_follows_position() {
        let mut sw = Switch::new(NodeId::new(1), NodeId::new(2));
        assert!(sw.shorted(0, 1));
        assert!(sw.connects(0, 1));

        sw.toggle();
        assert!(!sw.is_closed());
        assert!(!sw.shorted(0, 1));
        assert!(!sw.connects(0, 1));
    }

    #[test]
    fn test_momentary_starts_open() {
        let sw = Switch::momentary(NodeId::new(1), NodeId::new(2));
        assert!(!sw.is_closed());
        assert!(sw.is_momentary());
    }
}
