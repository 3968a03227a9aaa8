//! The element contract consumed by the simulation engine.
//!
//! Every circuit element type implements [`Element`]. The engine drives
//! elements through this trait in a fixed order each tick and never
//! inspects their internals:
//!
//! 1. topology build: [`Element::junction`] / [`Element::shorted`] feed
//!    the node registry, which writes assignments back through
//!    [`Element::set_post_node`] and [`Element::set_internal_node`];
//!    branch unknowns are handed out through [`Element::set_branch`].
//! 2. [`Element::stamp`] — fixed linear contributions, once per rebuild.
//! 3. per tick: [`Element::begin_step`], then one or more sub-iterations
//!    of [`Element::stamp_step`] + solve + [`Element::set_voltage`],
//!    then [`Element::set_branch_current`], [`Element::update_current`]
//!    and [`Element::end_step`] once the step commits.
//!
//! `begin_step` and `stamp_step` must be pure functions of committed
//! state and the current voltage estimate respectively: the engine
//! re-runs them freely when it shrinks the time step or iterates.

use std::any::Any;

use crate::mna::MnaSystem;
use crate::node::NodeId;

/// Ambient simulation state, passed explicitly into element calls.
#[derive(Debug, Clone, Copy)]
pub struct SimContext {
    /// Simulated time at the start of the step (s).
    pub time: f64,
    /// Size of the current step (s).
    pub time_step: f64,
}

/// Per-sub-iteration convergence bookkeeping.
///
/// Starts settled; any element whose discontinuous state moved during
/// the pass (a diode limiting its voltage step, for instance) calls
/// [`Iteration::unsettled`] to demand another pass.
#[derive(Debug)]
pub struct Iteration {
    settled: bool,
}

impl Iteration {
    pub fn new() -> Self {
        Self { settled: true }
    }

    /// Flag this pass as not yet settled.
    pub fn unsettled(&mut self) {
        self.settled = false;
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

impl Default for Iteration {
    fn default() -> Self {
        Self::new()
    }
}

/// A circuit element.
///
/// The `Any` supertrait lets hosts recover the concrete type of an
/// element they added (to toggle a switch, read a probe, edit a value).
pub trait Element: std::fmt::Debug + Any {
    /// Number of external connection posts.
    fn post_count(&self) -> usize;

    /// The editor-assigned junction a post is wired to. Immutable
    /// across topology analysis so switches can merge and un-merge.
    fn junction(&self, post: usize) -> NodeId;

    /// The dense node currently assigned to a post.
    fn post_node(&self, post: usize) -> NodeId;

    /// Registry write-back of a post's dense node.
    fn set_post_node(&mut self, post: usize, node: NodeId);

    /// Extra node slots this element needs beyond its posts.
    fn internal_node_count(&self) -> usize {
        0
    }

    /// Registry write-back of an internal node.
    fn set_internal_node(&mut self, _n: usize, _node: NodeId) {}

    /// Number of branch unknowns (voltage-defining stamps) required.
    fn voltage_source_count(&self) -> usize {
        0
    }

    /// Matrix-builder write-back of this element's branch bank.
    fn set_branch(&mut self, _n: usize, _branch: usize) {}

    /// True if posts `a` and `b` are always short-circuited through
    /// this element (wires, closed switches). Seeds the union-find.
    fn shorted(&self, _a: usize, _b: usize) -> bool {
        false
    }

    /// True if a finite-impedance path exists between posts `a` and
    /// `b`; used by the ground-path closure check. Gate inputs and
    /// open switches return false.
    fn connects(&self, _a: usize, _b: usize) -> bool {
        true
    }

    /// True if the element internally ties this post toward ground
    /// (rails, gate output stages).
    fn has_ground_connection(&self, _post: usize) -> bool {
        false
    }

    /// True if this post *is* the ground reference.
    fn is_ground_post(&self, _post: usize) -> bool {
        false
    }

    /// True if the element's stamps depend on the solution, forcing a
    /// matrix re-stamp and re-factor every sub-iteration.
    fn nonlinear(&self) -> bool {
        false
    }

    /// Stamp the fixed linear part. Called once per topology or value
    /// rebuild, and again whenever the time step changes.
    fn stamp(&mut self, _mna: &mut MnaSystem, _ctx: &SimContext) {}

    /// Called once per time step before iteration: refresh companion
    /// sources, evaluate time-varying waveforms. Must depend only on
    /// committed state and `ctx`.
    fn begin_step(&mut self, _ctx: &SimContext) {}

    /// Called every sub-iteration: RHS updates for linear elements,
    /// full re-linearization for nonlinear ones. Must be a pure
    /// function of the current voltage estimate.
    fn stamp_step(&mut self, _mna: &mut MnaSystem, _iteration: &mut Iteration) {}

    /// Engine write-back of the solved voltage at a post.
    fn set_voltage(&mut self, post: usize, volts: f64);

    /// Engine write-back of a solved branch current (bank-local index).
    fn set_branch_current(&mut self, _n: usize, _amps: f64) {}

    /// Recompute the element's reported current after a committed
    /// solve.
    fn update_current(&mut self) {}

    /// The element's reported current (A).
    fn current(&self) -> f64 {
        0.0
    }

    /// Commit phase after a converged step: latched state (registers,
    /// doping widths, companion memory) advances here and only here.
    fn end_step(&mut self, _ctx: &SimContext) {}

    /// Return to the initial operating state.
    fn reset(&mut self);

    /// Human-readable state lines for the host UI.
    fn info(&self) -> Vec<String> {
        Vec::new()
    }
}

impl dyn Element {
    /// Downcast a borrowed element to its concrete type.
    pub fn downcast_ref<T: Element>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }

    /// Downcast a mutably borrowed element to its concrete type.
    pub fn downcast_mut<T: Element>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut()
    }
}
