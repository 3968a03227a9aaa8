//! Junction diodes, including Zener breakdown.
//!
//! The junction model is calibrated from a forward drop at 1 A rather
//! than SPICE-style parameters: `vd_coef = ln(1/Is + 1) / fwdrop` makes
//! the exponential hit 1 A at the requested drop. Newton steps across
//! the exponential are limited around the critical voltage; whenever a
//! step is limited or the operating point moves appreciably, the pass
//! is flagged unsettled so the controller iterates again.

use voltlab_core::units::format_unit;
use voltlab_core::{Element, Iteration, MnaSystem, NodeId};

use crate::body::TwoTerminal;

/// Saturation (leakage) current of the junction (A).
const LEAKAGE: f64 = 1e-14;

/// Conductance floor stamped in parallel with the linearized junction.
/// Keeps subnetworks isolated behind off diodes from floating on the
/// leakage conductance alone, where the iteration creeps instead of
/// converging.
const GMIN: f64 = 1e-12;

/// Exponential junction with optional breakdown, linearized per
/// Newton sub-iteration.
#[derive(Debug, Clone)]
pub struct Junction {
    zvoltage: f64,
    vd_coef: f64,
    vt: f64,
    vcrit: f64,
    zoffset: f64,
    last_vd: f64,
}

impl Junction {
    pub fn new(fwdrop: f64, zvoltage: f64) -> Self {
        let mut j = Self {
            zvoltage: 0.0,
            vd_coef: 0.0,
            vt: 0.0,
            vcrit: 0.0,
            zoffset: 0.0,
            last_vd: 0.0,
        };
        j.setup(fwdrop, zvoltage);
        j
    }

    /// Recalibrate the model; called when the user edits the drop.
    pub fn setup(&mut self, fwdrop: f64, zvoltage: f64) {
        self.zvoltage = zvoltage;
        self.vd_coef = (1.0 / LEAKAGE + 1.0).ln() / fwdrop;
        self.vt = 1.0 / self.vd_coef;
        self.vcrit = self.vt * (self.vt / (std::f64::consts::SQRT_2 * LEAKAGE)).ln();
        if zvoltage == 0.0 {
            self.zoffset = 0.0;
        } else {
            // Calibrate the breakdown exponential to carry 5 mA at the
            // rated voltage.
            let i = -0.005;
            self.zoffset = zvoltage - (-(1.0 + i / LEAKAGE)).ln() / self.vd_coef;
        }
    }

    pub fn reset(&mut self) {
        self.last_vd = 0.0;
    }

    /// Limit a Newton step across the exponential, flagging the pass
    /// unsettled when limiting kicks in.
    fn limit_step(&self, mut vnew: f64, mut vold: f64, iteration: &mut Iteration) -> f64 {
        if vnew > self.vcrit && (vnew - vold).abs() > 2.0 * self.vt {
            if vold > 0.0 {
                let arg = 1.0 + (vnew - vold) / self.vt;
                vnew = if arg > 0.0 {
                    vold + self.vt * arg.ln()
                } else {
                    self.vcrit
                };
            } else {
                vnew = self.vt * (vnew / self.vt).ln();
            }
            iteration.unsettled();
        } else if vnew < 0.0 && self.zoffset != 0.0 {
            // Mirror into the breakdown region and limit there.
            vnew = -vnew - self.zoffset;
            vold = -vold - self.zoffset;
            if vnew > self.vcrit && (vnew - vold).abs() > 2.0 * self.vt {
                if vold > 0.0 {
                    let arg = 1.0 + (vnew - vold) / self.vt;
                    vnew = if arg > 0.0 {
                        vold + self.vt * arg.ln()
                    } else {
                        self.vcrit
                    };
                } else {
                    vnew = self.vt * (vnew / self.vt).ln();
                }
                iteration.unsettled();
            }
            vnew = -(vnew + self.zoffset);
        }
        vnew
    }

    /// Linearize at the current voltage estimate and stamp the
    /// conductance + Norton current pair.
    pub fn stamp_step(
        &mut self,
        mna: &mut MnaSystem,
        anode: NodeId,
        cathode: NodeId,
        volt_diff: f64,
        iteration: &mut Iteration,
    ) {
        if (volt_diff - self.last_vd).abs() > 0.01 {
            iteration.unsettled();
        }
        let vd = self.limit_step(volt_diff, self.last_vd, iteration);
        self.last_vd = vd;

        if vd >= 0.0 || self.zvoltage == 0.0 {
            // Forward region; linear for reverse voltages, where the
            // exponential is flat anyway.
            let mut eval = (vd * self.vd_coef).exp();
            if vd < 0.0 {
                eval = 1.0;
            }
            let geq = self.vd_coef * LEAKAGE * eval;
            let nc = (eval - 1.0) * LEAKAGE - geq * vd;
            mna.stamp_conductance(anode, cathode, geq + GMIN);
            mna.stamp_current_source(anode, cathode, nc);
        } else {
            // Zener breakdown: forward and mirrored reverse
            // exponentials superposed.
            let fwd = (vd * self.vd_coef).exp();
            let rev = ((-vd - self.zoffset) * self.vd_coef).exp();
            let geq = LEAKAGE * self.vd_coef * (fwd + rev);
            let nc = LEAKAGE * (fwd - rev - 1.0) + geq * (-vd);
            mna.stamp_conductance(anode, cathode, geq + GMIN);
            mna.stamp_current_source(anode, cathode, nc);
        }
    }

    /// Junction current at a committed voltage.
    pub fn calculate_current(&self, volt_diff: f64) -> f64 {
        if volt_diff >= 0.0 || self.zvoltage == 0.0 {
            LEAKAGE * ((volt_diff * self.vd_coef).exp() - 1.0)
        } else {
            LEAKAGE
                * ((volt_diff * self.vd_coef).exp()
                    - ((-volt_diff - self.zoffset) * self.vd_coef).exp()
                    - 1.0)
        }
    }
}

/// Default forward drop, calibrated to match a 1N4004 at 1 A.
const DEFAULT_FWDROP: f64 = 0.805904783;

/// A junction diode. Anode is post 0.
#[derive(Debug, Clone)]
pub struct Diode {
    body: TwoTerminal,
    model: Junction,
    fwdrop: f64,
    zvoltage: f64,
}

impl Diode {
    pub fn new(anode: NodeId, cathode: NodeId) -> Self {
        Self::with_forward_drop(anode, cathode, DEFAULT_FWDROP)
    }

    pub fn with_forward_drop(anode: NodeId, cathode: NodeId, fwdrop: f64) -> Self {
        Self {
            body: TwoTerminal::new(anode, cathode),
            model: Junction::new(fwdrop, 0.0),
            fwdrop,
            zvoltage: 0.0,
        }
    }

    /// A Zener diode with the given breakdown voltage.
    pub fn zener(anode: NodeId, cathode: NodeId, zvoltage: f64) -> Self {
        Self {
            body: TwoTerminal::new(anode, cathode),
            model: Junction::new(DEFAULT_FWDROP, zvoltage),
            fwdrop: DEFAULT_FWDROP,
            zvoltage,
        }
    }

    pub fn set_forward_drop(&mut self, fwdrop: f64) {
        if fwdrop > 0.0 {
            self.fwdrop = fwdrop;
            self.model.setup(fwdrop, self.zvoltage);
        }
    }

    /// Voltage across the junction, anode minus cathode.
    pub fn voltage_diff(&self) -> f64 {
        self.body.voltage_diff()
    }
}

impl Element for Diode {
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

    fn stamp_step(&mut self, mna: &mut MnaSystem, iteration: &mut Iteration) {
        self.model.stamp_step(
            mna,
            self.body.node(0),
            self.body.node(1),
            self.body.voltage_diff(),
            iteration,
        );
    }

    fn set_voltage(&mut self, post: usize, volts: f64) {
        self.body.set_voltage(post, volts);
    }

    fn update_current(&mut self) {
        let amps = self.model.calculate_current(self.body.voltage_diff());
        self.body.set_current(amps);
    }

    fn current(&self) -> f64 {
        self.body.current()
    }

    fn reset(&mut self) {
        self.body.reset();
        self.model.reset();
    }

    fn info(&self) -> Vec<String> {
        let name = if self.zvoltage == 0.0 {
            "diode"
        } else {
            "Zener diode"
        };
        vec![
            name.into(),
            format!("I = {}", format_unit(self.body.current(), "A")),
            format!("Vd = {}", format_unit(self.body.voltage_diff(), "V")),
            format!("Vf = {}", format_unit(self.fwdrop, "V")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_current_at_rated_drop() {
        let j = Junction::new(DEFAULT_FWDROP, 0.0);
        let i = j.calculate_current(DEFAULT_FWDROP);
        assert!(
            (i - 1.0).abs() < 0.01,
            "I at rated drop = {i} (expected ≈ 1 A)"
        );
    }

    #[test]
    fn test_reverse_current_is_leakage() {
        let j = Junction::new(DEFAULT_FWDROP, 0.0);
        let i = j.calculate_current(-5.0);
        assert!(i < 0.0);
        assert!(i.abs() <= LEAKAGE * 1.0001, "reverse current {i}");
    }

    #[test]
    fn test_limit_step_flags_unsettled() {
        let j = Junction::new(DEFAULT_FWDROP, 0.0);
        let mut iteration = Iteration::new();
        let limited = j.limit_step(5.0, 0.0, &mut iteration);
        assert!(limited < 5.0, "step should be limited, got {limited}");
        assert!(!iteration.is_settled());
    }

    #[test]
    fn test_small_step_stays_settled() {
        let j = Junction::new(DEFAULT_FWDROP, 0.0);
        let mut iteration = Iteration::new();
        let v = j.limit_step(0.41, 0.4, &mut iteration);
        assert_eq!(v, 0.41);
        assert!(iteration.is_settled());
    }

    #[test]
    fn test_zener_breakdown_conducts() {
        let j = Junction::new(DEFAULT_FWDROP, 5.6);
        // The breakdown branch is calibrated to 5 mA at the rated
        // voltage.
        let i = j.calculate_current(-5.6);
        assert!(
            (i + 0.005).abs() < 5e-4,
            "breakdown current = {i} (expected ≈ -5 mA)"
        );
        // Below breakdown it is negligible.
        let i = j.calculate_current(-4.0);
        assert!(i.abs() < 1e-6, "pre-breakdown current = {i}");
    }
}
