//! Nonlinear iteration controller.
//!
//! Each time step runs repeated sub-iterations: restore the fixed
//! stamps, let every element stamp its per-iteration part (nonlinear
//! elements re-linearized at the current voltage estimate), solve, and
//! write voltages back. The step converges when no element flagged the
//! pass unsettled and successive solutions agree within the hybrid
//! absolute + relative tolerance; node voltages in a running circuit
//! span microvolts to hundreds of volts, so neither criterion alone is
//! usable.

use nalgebra::DVector;
use voltlab_core::{Element, Iteration, MnaSystem};

use crate::error::{Error, Result};
use crate::linear::LuCache;

/// Convergence tolerances for the sub-iteration loop.
///
/// The exact values are tuning, not design: defaults follow common
/// simulator practice and every property the engine guarantees is
/// tested against behavior, not against these constants.
#[derive(Debug, Clone)]
pub struct Tolerances {
    /// Absolute voltage tolerance (V).
    pub v_abstol: f64,
    /// Relative voltage tolerance.
    pub v_reltol: f64,
    /// Absolute branch-current tolerance (A).
    pub i_abstol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            v_abstol: 1e-6,
            v_reltol: 1e-3,
            i_abstol: 1e-9,
        }
    }
}

/// Run sub-iterations until the solution settles.
///
/// Returns the number of passes used, or
/// [`Error::ConvergenceFailed`] once `max_iterations` passes did not
/// settle. On success `solution` holds the committed solution and every
/// element has the solved voltages written back.
pub fn converge(
    elements: &mut [Box<dyn Element>],
    mna: &mut MnaSystem,
    lu: &mut LuCache,
    solution: &mut DVector<f64>,
    tolerances: &Tolerances,
    max_iterations: usize,
) -> Result<usize> {
    for pass in 0..max_iterations {
        mna.reset_to_fixed();

        let mut iteration = Iteration::new();
        for element in elements.iter_mut() {
            element.stamp_step(mna, &mut iteration);
        }

        let next = lu.solve(mna.matrix(), mna.matrix_version(), mna.rhs())?;
        write_back(elements, &next);

        let within = within_tolerance(solution, &next, mna.num_nodes(), tolerances);
        *solution = next;

        // The first pass solves from a stale estimate; gates and
        // sources need a second pass to confirm nothing moved.
        if pass > 0 && iteration.is_settled() && within {
            return Ok(pass + 1);
        }
    }

    Err(Error::ConvergenceFailed {
        iterations: max_iterations,
    })
}

/// Write solved node voltages back into every element's posts.
fn write_back(elements: &mut [Box<dyn Element>], solution: &DVector<f64>) {
    for element in elements.iter_mut() {
        for post in 0..element.post_count() {
            let volts = match element.post_node(post).index() {
                Some(i) => solution[i],
                None => 0.0,
            };
            element.set_voltage(post, volts);
        }
    }
}

fn within_tolerance(
    old: &DVector<f64>,
    new: &DVector<f64>,
    num_nodes: usize,
    tolerances: &Tolerances,
) -> bool {
    for i in 0..new.len() {
        let delta = (new[i] - old[i]).abs();
        let abstol = if i < num_nodes {
            tolerances.v_abstol
        } else {
            tolerances.i_abstol
        };
        let tol = tolerances.v_reltol * new[i].abs().max(old[i].abs()) + abstol;
        if delta > tol {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;
    use voltlab_core::{NodeId, SimContext};

    #[test]
    fn test_within_tolerance() {
        let tol = Tolerances::default();
        let old = dvector![1.0, 2.0, 0.001];
        let near = dvector![1.0000001, 2.0000001, 0.001];
        assert!(within_tolerance(&old, &near, 2, &tol));

        let far = dvector![1.1, 2.0, 0.001];
        assert!(!within_tolerance(&old, &far, 2, &tol));
    }

    /// A divider stamped as fixed conductances plus a diode-free test
    /// element that flips its stamp once, forcing a second pass.
    #[derive(Debug)]
    struct SettlingLoad {
        junctions: [NodeId; 2],
        nodes: [NodeId; 2],
        volts: [f64; 2],
        passes: usize,
    }

    impl Element for SettlingLoad {
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
        fn nonlinear(&self) -> bool {
            true
        }
        fn stamp(&mut self, _mna: &mut MnaSystem, _ctx: &SimContext) {}
        fn stamp_step(&mut self, mna: &mut MnaSystem, iteration: &mut Iteration) {
            let pass = self.passes;
            self.passes += 1;
            // The load looks different on the very first pass only.
            let ohms = if pass == 0 { 500.0 } else { 1000.0 };
            if pass == 0 {
                iteration.unsettled();
            }
            mna.stamp_resistor(self.nodes[0], self.nodes[1], ohms);
        }
        fn set_voltage(&mut self, post: usize, volts: f64) {
            self.volts[post] = volts;
        }
        fn reset(&mut self) {}
    }

    #[test]
    fn test_converge_settles_after_state_change() {
        // 1 A into node 1, test load from node 1 to ground.
        let mut mna = MnaSystem::new(1, 0);
        mna.stamp_current_source(NodeId::GROUND, NodeId::new(1), 1.0);
        mna.snapshot_fixed();

        let mut elements: Vec<Box<dyn Element>> = vec![Box::new(SettlingLoad {
            junctions: [NodeId::new(1), NodeId::GROUND],
            nodes: [NodeId::new(1), NodeId::GROUND],
            volts: [0.0; 2],
            passes: 0,
        })];

        let mut lu = LuCache::new();
        let mut solution = dvector![0.0];
        let passes = converge(
            &mut elements,
            &mut mna,
            &mut lu,
            &mut solution,
            &Tolerances::default(),
            50,
        )
        .unwrap();

        assert!(passes >= 3, "state flip must force extra passes: {passes}");
        assert!(
            (solution[0] - 1000.0).abs() < 1e-6,
            "V = {} (expected 1000)",
            solution[0]
        );
    }

    #[test]
    fn test_iteration_cap() {
        #[derive(Debug)]
        struct NeverSettles {
            node: NodeId,
        }
        impl Element for NeverSettles {
            fn post_count(&self) -> usize {
                1
            }
            fn junction(&self, _post: usize) -> NodeId {
                self.node
            }
            fn post_node(&self, _post: usize) -> NodeId {
                self.node
            }
            fn set_post_node(&mut self, _post: usize, node: NodeId) {
                self.node = node;
            }
            fn nonlinear(&self) -> bool {
                true
            }
            fn stamp_step(&mut self, mna: &mut MnaSystem, iteration: &mut Iteration) {
                iteration.unsettled();
                mna.stamp_resistor(self.node, NodeId::GROUND, 1000.0);
            }
            fn set_voltage(&mut self, _post: usize, _volts: f64) {}
            fn reset(&mut self) {}
        }

        let mut mna = MnaSystem::new(1, 0);
        mna.snapshot_fixed();
        let mut elements: Vec<Box<dyn Element>> = vec![Box::new(NeverSettles {
            node: NodeId::new(1),
        })];
        let mut lu = LuCache::new();
        let mut solution = dvector![0.0];

        let err = converge(
            &mut elements,
            &mut mna,
            &mut lu,
            &mut solution,
            &Tolerances::default(),
            20,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConvergenceFailed { iterations: 20 }));
    }
}
