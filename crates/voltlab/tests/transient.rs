//! Companion-model integration accuracy.

use approx::assert_relative_eq;
use voltlab::prelude::*;

/// RC charge circuit: rail 5V (1) -- R 1k -- (2) -- C 1µF -- GND,
/// tau = 1 ms.
fn rc_charge(integration: Integration, time_step: f64) -> Simulation {
    let mut sim = Simulation::new();
    sim.config_mut().time_step = time_step;
    sim.add(Rail::dc(NodeId::new(1), 5.0));
    sim.add(Resistor::new(NodeId::new(1), NodeId::new(2), 1000.0));
    sim.add(Capacitor::new(NodeId::new(2), NodeId::GROUND, 1e-6).with_integration(integration));
    sim
}

#[test]
fn test_rc_charges_to_supply() {
    let mut sim = rc_charge(Integration::Trapezoidal, 1e-5);
    // 5 time constants.
    sim.run(500).unwrap();
    assert_relative_eq!(sim.voltage(NodeId::new(2)), 5.0, max_relative = 0.01);
}

#[test]
fn test_rc_tracks_analytic_exponential() {
    for integration in [Integration::BackwardEuler, Integration::Trapezoidal] {
        let mut sim = rc_charge(integration, 1e-5);
        sim.run(50).unwrap();
        let analytic = 5.0 * (1.0 - (-sim.time() / 1e-3).exp());
        let v = sim.voltage(NodeId::new(2));
        assert!(
            (v - analytic).abs() < 0.05,
            "{integration:?}: V(cap) = {v} (analytic {analytic})"
        );
    }
}

/// Sine-driven RC, which starts from a consistent state (source and
/// capacitor current both zero) so the integration order is visible.
///
/// ```text
/// rail 3·sin(2π·200·t) (1) -- R 1k -- (2) -- C 1µF -- GND
/// ```
///
/// Returns the error against the closed-form response at `t`.
fn rc_sine_error(integration: Integration, time_step: f64) -> f64 {
    let mut sim = Simulation::new();
    sim.config_mut().time_step = time_step;
    sim.add(Rail::new(NodeId::new(1), Waveform::sine(3.0, 200.0)));
    sim.add(Resistor::new(NodeId::new(1), NodeId::new(2), 1000.0));
    sim.add(Capacitor::new(NodeId::new(2), NodeId::GROUND, 1e-6).with_integration(integration));

    let target = 2.5e-3;
    let steps = (target / time_step).round() as usize;
    sim.run(steps).expect("sine RC should simulate");

    let tau = 1e-3;
    let w = std::f64::consts::TAU * 200.0;
    let wt = w * tau;
    let t = sim.time();
    let analytic =
        3.0 / (1.0 + wt * wt) * ((w * t).sin() - wt * (w * t).cos() + wt * (-t / tau).exp());
    (sim.voltage(NodeId::new(2)) - analytic).abs()
}

/// Halving the step should halve backward Euler's error (first order)
/// and quarter trapezoidal's (second order).
#[test]
fn test_integration_order_of_accuracy() {
    let be_coarse = rc_sine_error(Integration::BackwardEuler, 2e-5);
    let be_fine = rc_sine_error(Integration::BackwardEuler, 1e-5);
    let ratio = be_coarse / be_fine;
    assert!(
        (1.6..2.6).contains(&ratio),
        "backward Euler ratio {ratio} (expected ≈ 2): {be_coarse} vs {be_fine}"
    );

    let trap_coarse = rc_sine_error(Integration::Trapezoidal, 2e-5);
    let trap_fine = rc_sine_error(Integration::Trapezoidal, 1e-5);
    let ratio = trap_coarse / trap_fine;
    assert!(
        (3.2..4.8).contains(&ratio),
        "trapezoidal ratio {ratio} (expected ≈ 4): {trap_coarse} vs {trap_fine}"
    );

    // Second order also means trapezoidal wins outright.
    assert!(
        trap_fine < be_fine / 100.0,
        "trapezoidal {trap_fine} should be far below backward Euler {be_fine}"
    );
}

/// RL rise: rail 5V -> R 1k -> L 1H -> ground, tau = 1 ms.
#[test]
fn test_rl_current_rise() {
    let mut sim = Simulation::new();
    sim.config_mut().time_step = 1e-5;
    sim.add(Rail::dc(NodeId::new(1), 5.0));
    sim.add(Resistor::new(NodeId::new(1), NodeId::new(2), 1000.0));
    let ind = sim.add(Inductor::new(NodeId::new(2), NodeId::GROUND, 1.0));

    // One time constant.
    sim.run(100).unwrap();

    let expected = 5e-3 * (1.0 - (-1.0_f64).exp());
    assert_relative_eq!(sim.current(ind), expected, max_relative = 0.02);
}

/// A sine-driven divider follows the waveform tick by tick; the source
/// value belongs to the end-of-step time the solve targets.
#[test]
fn test_sine_source_tracks_waveform() {
    let mut sim = Simulation::new();
    sim.config_mut().time_step = 1e-4;
    sim.add(Rail::new(NodeId::new(1), Waveform::sine(10.0, 50.0)));
    sim.add(Resistor::new(NodeId::new(1), NodeId::new(2), 1000.0));
    sim.add(Resistor::new(NodeId::new(2), NodeId::GROUND, 1000.0));

    for _ in 0..200 {
        sim.step().unwrap();
        let expected = 10.0 * (std::f64::consts::TAU * 50.0 * sim.time()).sin() / 2.0;
        let v2 = sim.voltage(NodeId::new(2));
        assert!(
            (v2 - expected).abs() < 1e-9,
            "V(2) = {v2} at t = {} (expected {expected})",
            sim.time()
        );
    }
}
