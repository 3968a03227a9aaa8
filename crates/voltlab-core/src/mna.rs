//! Modified Nodal Analysis (MNA) matrix structures.
//!
//! The system is `Ax = b` where `A` is the conductance matrix augmented
//! with branch-current coupling rows/columns, `x` is node voltages
//! followed by branch currents, and `b` is the RHS vector. Ground is
//! excluded, so the system is square of size
//! `num_nodes - 1 + num_branches`.
//!
//! All stamping is additive: repeated calls accumulate, matching
//! Kirchhoff current-law construction by summation over incident
//! elements. The builder keeps a snapshot of the fixed linear part so
//! each nonlinear sub-iteration restarts from it instead of re-stamping
//! every element.

use nalgebra::{DMatrix, DVector};

use crate::node::NodeId;

/// Conductance clamped in when a caller slips a non-positive resistance
/// past the element-level validation.
const MIN_CONDUCTANCE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct MnaSystem {
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
    fixed_matrix: DMatrix<f64>,
    fixed_rhs: DVector<f64>,
    /// Number of non-ground nodes.
    num_nodes: usize,
    /// Number of branch unknowns.
    num_branches: usize,
    /// Bumped whenever a matrix (not RHS) cell changes, so a cached
    /// factorization knows when it is stale.
    matrix_version: u64,
    fixed_version: u64,
}

impl MnaSystem {
    /// Create a zeroed system.
    ///
    /// # Arguments
    /// * `num_nodes` - number of nodes excluding ground
    /// * `num_branches` - number of branch-current unknowns
    pub fn new(num_nodes: usize, num_branches: usize) -> Self {
        let size = num_nodes + num_branches;
        Self {
            matrix: DMatrix::zeros(size, size),
            rhs: DVector::zeros(size),
            fixed_matrix: DMatrix::zeros(size, size),
            fixed_rhs: DVector::zeros(size),
            num_nodes,
            num_branches,
            matrix_version: 0,
            fixed_version: 0,
        }
    }

    /// Total size of the system (nodes + branch unknowns).
    pub fn size(&self) -> usize {
        self.num_nodes + self.num_branches
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_branches(&self) -> usize {
        self.num_branches
    }

    /// Matrix row of a branch unknown.
    pub fn branch_row(&self, branch: usize) -> usize {
        self.num_nodes + branch
    }

    /// Zero the matrix and RHS before a full re-stamp.
    pub fn clear(&mut self) {
        self.matrix.fill(0.0);
        self.rhs.fill(0.0);
        self.matrix_version += 1;
    }

    /// Record the current matrix and RHS as the fixed linear part.
    pub fn snapshot_fixed(&mut self) {
        self.fixed_matrix.copy_from(&self.matrix);
        self.fixed_rhs.copy_from(&self.rhs);
        self.fixed_version = self.matrix_version;
    }

    /// Restore the fixed linear part, discarding per-iteration stamps.
    ///
    /// The version counter is monotonic: restoring after nonlinear
    /// stamps lands the matrix content back on the snapshot but under
    /// a fresh version, so a factorization taken mid-iteration can
    /// never be mistaken for the restored state. When nothing touched
    /// the matrix since the snapshot the version is left alone and a
    /// cached factorization stays valid.
    pub fn reset_to_fixed(&mut self) {
        self.rhs.copy_from(&self.fixed_rhs);
        if self.matrix_version != self.fixed_version {
            self.matrix.copy_from(&self.fixed_matrix);
            self.matrix_version += 1;
            self.fixed_version = self.matrix_version;
        }
    }

    /// Current matrix version; changes whenever a coefficient does.
    pub fn matrix_version(&self) -> u64 {
        self.matrix_version
    }

    /// Low-level escape hatch: add `value` at a raw matrix cell.
    pub fn stamp_matrix(&mut self, row: usize, col: usize, value: f64) {
        self.matrix[(row, col)] += value;
        self.matrix_version += 1;
    }

    /// Low-level escape hatch: add `value` at a raw RHS row.
    pub fn stamp_right_side(&mut self, row: usize, value: f64) {
        self.rhs[row] += value;
    }

    /// Stamp a conductance between two nodes.
    ///
    /// For a conductance G between nodes i and j:
    /// - A[i,i] += G, A[j,j] += G, A[i,j] -= G, A[j,i] -= G
    pub fn stamp_conductance(&mut self, a: NodeId, b: NodeId, g: f64) {
        if let Some(i) = a.index() {
            self.matrix[(i, i)] += g;
        }
        if let Some(j) = b.index() {
            self.matrix[(j, j)] += g;
        }
        if let (Some(i), Some(j)) = (a.index(), b.index()) {
            self.matrix[(i, j)] -= g;
            self.matrix[(j, i)] -= g;
        }
        self.matrix_version += 1;
    }

    /// Stamp a resistor between two nodes.
    ///
    /// Elements validate their parameters; a non-positive value that
    /// still reaches this point is clamped to a near-open conductance
    /// rather than corrupting the matrix.
    pub fn stamp_resistor(&mut self, a: NodeId, b: NodeId, ohms: f64) {
        debug_assert!(ohms > 0.0, "non-positive resistance {ohms}");
        let g = if ohms > 0.0 {
            1.0 / ohms
        } else {
            MIN_CONDUCTANCE
        };
        self.stamp_conductance(a, b, g);
    }

    /// Stamp a current source driving `amps` from node `a` to node `b`
    /// through the source (current enters the circuit at `b`).
    pub fn stamp_current_source(&mut self, a: NodeId, b: NodeId, amps: f64) {
        if let Some(i) = a.index() {
            self.rhs[i] -= amps;
        }
        if let Some(j) = b.index() {
            self.rhs[j] += amps;
        }
    }

    /// Stamp a voltage source enforcing `V(pos) - V(neg) = volts`,
    /// using branch unknown `branch` for its current.
    pub fn stamp_voltage_source(&mut self, pos: NodeId, neg: NodeId, branch: usize, volts: f64) {
        let row = self.branch_row(branch);
        if let Some(i) = pos.index() {
            self.matrix[(i, row)] += 1.0;
            self.matrix[(row, i)] += 1.0;
        }
        if let Some(j) = neg.index() {
            self.matrix[(j, row)] -= 1.0;
            self.matrix[(row, j)] -= 1.0;
        }
        self.rhs[row] += volts;
        self.matrix_version += 1;
    }

    /// RHS-only update of a voltage source stamped with a placeholder
    /// value; used by time-varying sources and gate outputs every
    /// sub-iteration. Leaves the matrix untouched.
    pub fn update_voltage_source(&mut self, branch: usize, volts: f64) {
        let row = self.branch_row(branch);
        self.rhs[row] = volts;
    }

    /// Stamp a voltage-controlled voltage source:
    /// `V(out_pos) - V(out_neg) = gain * (V(ctrl_pos) - V(ctrl_neg))`.
    pub fn stamp_vcvs(
        &mut self,
        out_pos: NodeId,
        out_neg: NodeId,
        ctrl_pos: NodeId,
        ctrl_neg: NodeId,
        gain: f64,
        branch: usize,
    ) {
        let row = self.branch_row(branch);
        if let Some(i) = out_pos.index() {
            self.matrix[(i, row)] += 1.0;
            self.matrix[(row, i)] += 1.0;
        }
        if let Some(j) = out_neg.index() {
            self.matrix[(j, row)] -= 1.0;
            self.matrix[(row, j)] -= 1.0;
        }
        if let Some(i) = ctrl_pos.index() {
            self.matrix[(row, i)] -= gain;
        }
        if let Some(j) = ctrl_neg.index() {
            self.matrix[(row, j)] += gain;
        }
        self.matrix_version += 1;
    }

    /// Stamp a voltage-controlled current source:
    /// `I(out_pos -> out_neg) = gm * (V(ctrl_pos) - V(ctrl_neg))`.
    pub fn stamp_vccs(
        &mut self,
        out_pos: NodeId,
        out_neg: NodeId,
        ctrl_pos: NodeId,
        ctrl_neg: NodeId,
        gm: f64,
    ) {
        let op = out_pos.index();
        let on = out_neg.index();
        let cp = ctrl_pos.index();
        let cn = ctrl_neg.index();
        for (out, sign) in [(op, 1.0), (on, -1.0)] {
            let Some(i) = out else { continue };
            if let Some(k) = cp {
                self.matrix[(i, k)] += sign * gm;
            }
            if let Some(k) = cn {
                self.matrix[(i, k)] -= sign * gm;
            }
        }
        self.matrix_version += 1;
    }

    /// Stamp a current-controlled current source:
    /// `I(out_pos -> out_neg) = gain * I(ctrl_branch)`.
    pub fn stamp_cccs(&mut self, out_pos: NodeId, out_neg: NodeId, ctrl_branch: usize, gain: f64) {
        let col = self.branch_row(ctrl_branch);
        if let Some(i) = out_pos.index() {
            self.matrix[(i, col)] += gain;
        }
        if let Some(j) = out_neg.index() {
            self.matrix[(j, col)] -= gain;
        }
        self.matrix_version += 1;
    }

    /// Get a reference to the coefficient matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Get a reference to the RHS vector.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_system() {
        let sys = MnaSystem::new(3, 1);
        assert_eq!(sys.size(), 4);
        assert_eq!(sys.num_nodes(), 3);
        assert_eq!(sys.num_branches(), 1);
        assert_eq!(sys.branch_row(0), 3);
    }

    #[test]
    fn test_stamp_conductance() {
        let mut sys = MnaSystem::new(2, 0);

        sys.stamp_conductance(NodeId::new(1), NodeId::new(2), 1.0);

        assert_eq!(sys.matrix()[(0, 0)], 1.0);
        assert_eq!(sys.matrix()[(1, 1)], 1.0);
        assert_eq!(sys.matrix()[(0, 1)], -1.0);
        assert_eq!(sys.matrix()[(1, 0)], -1.0);
    }

    #[test]
    fn test_stamp_conductance_to_ground() {
        let mut sys = MnaSystem::new(2, 0);

        sys.stamp_conductance(NodeId::new(1), NodeId::GROUND, 1.0);

        assert_eq!(sys.matrix()[(0, 0)], 1.0);
        assert_eq!(sys.matrix()[(1, 1)], 0.0);
    }

    #[test]
    fn test_stamping_accumulates() {
        let mut sys = MnaSystem::new(1, 0);

        // Two 1 kΩ resistors in parallel from node 1 to ground.
        sys.stamp_resistor(NodeId::new(1), NodeId::GROUND, 1000.0);
        sys.stamp_resistor(NodeId::new(1), NodeId::GROUND, 1000.0);

        assert!((sys.matrix()[(0, 0)] - 0.002).abs() < 1e-15);
    }

    #[test]
    fn test_stamp_current_source() {
        let mut sys = MnaSystem::new(2, 0);

        // 1 A from ground into node 1.
        sys.stamp_current_source(NodeId::GROUND, NodeId::new(1), 1.0);

        assert_eq!(sys.rhs()[0], 1.0);
        assert_eq!(sys.rhs()[1], 0.0);
    }

    #[test]
    fn test_stamp_voltage_source() {
        let mut sys = MnaSystem::new(2, 1);

        // 5 V source between node 1 (+) and ground (-).
        sys.stamp_voltage_source(NodeId::new(1), NodeId::GROUND, 0, 5.0);

        assert_eq!(sys.matrix()[(0, 2)], 1.0);
        assert_eq!(sys.matrix()[(2, 0)], 1.0);
        assert_eq!(sys.rhs()[2], 5.0);
    }

    #[test]
    fn test_update_voltage_source_leaves_matrix_alone() {
        let mut sys = MnaSystem::new(1, 1);
        sys.stamp_voltage_source(NodeId::new(1), NodeId::GROUND, 0, 0.0);
        let version = sys.matrix_version();

        sys.update_voltage_source(0, 3.3);

        assert_eq!(sys.rhs()[1], 3.3);
        assert_eq!(sys.matrix_version(), version);
    }

    #[test]
    fn test_fixed_snapshot_roundtrip() {
        let mut sys = MnaSystem::new(2, 0);
        sys.stamp_conductance(NodeId::new(1), NodeId::new(2), 0.5);
        sys.snapshot_fixed();

        // A nonlinear pass piles more stamps on top.
        sys.stamp_conductance(NodeId::new(1), NodeId::GROUND, 2.0);
        sys.stamp_current_source(NodeId::GROUND, NodeId::new(1), 0.1);
        let stamped_version = sys.matrix_version();

        sys.reset_to_fixed();

        assert_eq!(sys.matrix()[(0, 0)], 0.5);
        assert_eq!(sys.rhs()[0], 0.0);
        // The restored matrix must not share a version with the
        // stamped one, or a cached factorization would be reused
        // against different coefficients.
        assert_ne!(sys.matrix_version(), stamped_version);

        // With no matrix stamps since the restore, another restore
        // keeps the version stable so factorizations stay cached.
        let restored_version = sys.matrix_version();
        sys.stamp_current_source(NodeId::GROUND, NodeId::new(2), 0.2);
        sys.reset_to_fixed();
        assert_eq!(sys.matrix_version(), restored_version);
    }

    #[test]
    fn test_stamp_vcvs() {
        // E1: out between node 1 and ground, ctrl between node 2 and
        // ground, gain 2.
        let mut sys = MnaSystem::new(2, 1);
        sys.stamp_vcvs(
            NodeId::new(1),
            NodeId::GROUND,
            NodeId::new(2),
            NodeId::GROUND,
            2.0,
            0,
        );

        assert_eq!(sys.matrix()[(0, 2)], 1.0);
        assert_eq!(sys.matrix()[(2, 0)], 1.0);
        assert_eq!(sys.matrix()[(2, 1)], -2.0);
    }

    #[test]
    fn test_stamp_cccs() {
        let mut sys = MnaSystem::new(2, 1);
        sys.stamp_cccs(NodeId::new(1), NodeId::new(2), 0, 3.0);

        assert_eq!(sys.matrix()[(0, 2)], 3.0);
        assert_eq!(sys.matrix()[(1, 2)], -3.0);
    }
}
