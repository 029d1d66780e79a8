//! The equation builder: stamps every component into an MNA system for a
//! given analysis mode.

use num_complex::Complex;

use crate::circuit::Circuit;
use crate::components::Component;

use super::mna::MnaMatrix;

/// Real-valued analysis modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RealMode {
    /// DC operating point: capacitors open, inductors short.
    Dc,
    /// One backward-Euler transient step of size `h`.
    Transient { h: f64 },
}

/// Stamp the full real system for DC or a transient step.
///
/// Nonlinear components are linearized about the guess held in
/// `matrix.x`, so the caller clears the matrix but leaves the solution
/// vector intact between Newton iterations.
pub fn stamp_real_system(circuit: &Circuit, matrix: &mut MnaMatrix<f64>, mode: RealMode) {
    for component in &circuit.components {
        match component {
            Component::Resistor(r) => {
                let n1 = circuit.node_index(r.nodes[0]);
                let n2 = circuit.node_index(r.nodes[1]);
                matrix.stamp_conductance(n1, n2, r.conductance());
            }

            Component::Capacitor(c) => {
                // Open circuit at DC; backward-Euler Norton companion in
                // transient: G_eq = C/h in parallel with I_eq = G_eq * v_prev
                if let RealMode::Transient { h } = mode {
                    let n1 = circuit.node_index(c.nodes[0]);
                    let n2 = circuit.node_index(c.nodes[1]);
                    matrix.stamp_conductance(n1, n2, c.conductance(h));
                    matrix.stamp_current_source(n1, n2, -c.history_current(h));
                }
            }

            Component::Inductor(l) => {
                let n1 = circuit.node_index(l.nodes[0]);
                let n2 = circuit.node_index(l.nodes[1]);
                let br = circuit.branch_index(l.branch);
                matrix.stamp_branch(n1, n2, br);
                match mode {
                    // Branch row reads V(a) - V(b) = 0: a short
                    RealMode::Dc => {}
                    // V(a) - V(b) - (L/h) I = -[(L/h) i_prev + v_prev]
                    RealMode::Transient { h } => {
                        matrix.add(br, br, -l.resistance(h));
                        matrix.add_source(br, -l.history_voltage(h));
                    }
                }
            }

            Component::VoltageSource(v) => {
                let n1 = circuit.node_index(v.nodes[0]);
                let n2 = circuit.node_index(v.nodes[1]);
                let br = circuit.branch_index(v.branch);
                matrix.stamp_branch(n1, n2, br);
                matrix.add_source(br, v.voltage());
            }

            Component::Diode(d) => {
                let n1 = circuit.node_index(d.nodes[0]);
                let n2 = circuit.node_index(d.nodes[1]);
                let v_op = matrix.voltage(n1) - matrix.voltage(n2);
                let (g, i_eq) = d.linearize(v_op);
                matrix.stamp_conductance(n1, n2, g);
                matrix.stamp_current_source(n1, n2, i_eq);
            }
        }
    }
}

/// Stamp the complex small-signal system at angular frequency `omega`.
/// Diodes contribute their conductance at the DC operating point held in
/// `dc_solution`.
pub fn stamp_ac_system(
    circuit: &Circuit,
    matrix: &mut MnaMatrix<Complex<f64>>,
    omega: f64,
    dc_solution: &[f64],
) {
    let real = |v: f64| Complex::new(v, 0.0);

    for component in &circuit.components {
        match component {
            Component::Resistor(r) => {
                let n1 = circuit.node_index(r.nodes[0]);
                let n2 = circuit.node_index(r.nodes[1]);
                matrix.stamp_conductance(n1, n2, real(r.conductance()));
            }

            Component::Capacitor(c) => {
                let n1 = circuit.node_index(c.nodes[0]);
                let n2 = circuit.node_index(c.nodes[1]);
                matrix.stamp_conductance(n1, n2, Complex::new(0.0, omega * c.capacitance));
            }

            Component::Inductor(l) => {
                // V(a) - V(b) - jwL I = 0
                let n1 = circuit.node_index(l.nodes[0]);
                let n2 = circuit.node_index(l.nodes[1]);
                let br = circuit.branch_index(l.branch);
                matrix.stamp_branch(n1, n2, br);
                matrix.add(br, br, Complex::new(0.0, -omega * l.inductance));
            }

            Component::VoltageSource(v) => {
                let n1 = circuit.node_index(v.nodes[0]);
                let n2 = circuit.node_index(v.nodes[1]);
                let br = circuit.branch_index(v.branch);
                matrix.stamp_branch(n1, n2, br);
                matrix.add_source(br, real(v.voltage()));
            }

            Component::Diode(d) => {
                let n1 = circuit.node_index(d.nodes[0]);
                let n2 = circuit.node_index(d.nodes[1]);
                let bias = |n: Option<usize>| n.map(|i| dc_solution[i]).unwrap_or(0.0);
                let v_op = bias(n1) - bias(n2);
                matrix.stamp_conductance(n1, n2, real(d.conductance(v_op)));
            }
        }
    }
}
