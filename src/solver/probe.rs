//! Probe resolution and evaluation.
//!
//! A probe names a scalar observable: a node voltage (`v_out`), a
//! component current (`L1.current`), a component terminal voltage
//! (`C1.voltage`), or a diode's internal node (`my_diode.internal_node`).
//! Names are resolved once per analysis into descriptors; reads index
//! into the solution vector without re-parsing.

use num_complex::Complex;

use crate::circuit::{Circuit, NodeId};
use crate::components::Component;
use crate::error::{NodalError, Result};

/// What a resolved probe points at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeTarget {
    /// Voltage of a node
    NodeVoltage(NodeId),
    /// Voltage across a component (index into the component set)
    ComponentVoltage(usize),
    /// Current through a component
    ComponentCurrent(usize),
    /// Internal-node voltage of a diode
    DiodeInternalNode(usize),
}

/// A resolved probe.
#[derive(Debug, Clone)]
pub struct Probe {
    pub name: String,
    pub target: ProbeTarget,
}

impl Probe {
    /// Resolve a dotted probe name against the circuit.
    pub fn resolve(circuit: &Circuit, name: &str) -> Result<Self> {
        let target = if let Some((component, field)) = name.split_once('.') {
            let idx = circuit
                .find_component(component)
                .ok_or_else(|| NodalError::unknown_variable(name))?;
            match field {
                "current" => ProbeTarget::ComponentCurrent(idx),
                "voltage" => ProbeTarget::ComponentVoltage(idx),
                "internal_node" => {
                    if !matches!(circuit.components[idx], Component::Diode(_)) {
                        return Err(NodalError::unknown_variable(name));
                    }
                    ProbeTarget::DiodeInternalNode(idx)
                }
                _ => return Err(NodalError::unknown_variable(name)),
            }
        } else {
            let node = circuit
                .find_node(name)
                .ok_or_else(|| NodalError::unknown_variable(name))?;
            ProbeTarget::NodeVoltage(node)
        };

        Ok(Self {
            name: name.to_string(),
            target,
        })
    }

    /// Evaluate against a real solution vector. `dc` selects DC
    /// semantics, where a capacitor carries no current.
    pub fn evaluate(&self, circuit: &Circuit, x: &[f64], dc: bool) -> f64 {
        let node_v = |node: NodeId| circuit.node_index(node).map(|i| x[i]).unwrap_or(0.0);

        match self.target {
            ProbeTarget::NodeVoltage(node) => node_v(node),

            ProbeTarget::ComponentVoltage(idx) => {
                let [a, b] = circuit.components[idx].nodes();
                node_v(a) - node_v(b)
            }

            ProbeTarget::ComponentCurrent(idx) => match &circuit.components[idx] {
                Component::Resistor(r) => {
                    (node_v(r.nodes[0]) - node_v(r.nodes[1])) * r.conductance()
                }
                Component::Capacitor(c) => {
                    if dc {
                        0.0
                    } else {
                        c.current()
                    }
                }
                Component::Inductor(l) => x[circuit.branch_index(l.branch)],
                Component::VoltageSource(v) => x[circuit.branch_index(v.branch)],
                Component::Diode(d) => d.current(node_v(d.nodes[0]) - node_v(d.nodes[1])),
            },

            ProbeTarget::DiodeInternalNode(idx) => match &circuit.components[idx] {
                Component::Diode(d) => {
                    d.internal_node_voltage(node_v(d.nodes[0]), node_v(d.nodes[1]))
                }
                _ => unreachable!("internal_node resolves only to diodes"),
            },
        }
    }

    /// Evaluate against a complex AC solution at angular frequency
    /// `omega`. Diode currents use the small-signal conductance at the DC
    /// operating point `dc_solution`.
    pub fn evaluate_ac(
        &self,
        circuit: &Circuit,
        x: &[Complex<f64>],
        omega: f64,
        dc_solution: &[f64],
    ) -> Complex<f64> {
        let zero = Complex::new(0.0, 0.0);
        let node_v = |node: NodeId| circuit.node_index(node).map(|i| x[i]).unwrap_or(zero);

        match self.target {
            ProbeTarget::NodeVoltage(node) => node_v(node),

            ProbeTarget::ComponentVoltage(idx) => {
                let [a, b] = circuit.components[idx].nodes();
                node_v(a) - node_v(b)
            }

            ProbeTarget::ComponentCurrent(idx) => match &circuit.components[idx] {
                Component::Resistor(r) => {
                    (node_v(r.nodes[0]) - node_v(r.nodes[1])) * r.conductance()
                }
                Component::Capacitor(c) => {
                    let v = node_v(c.nodes[0]) - node_v(c.nodes[1]);
                    v * Complex::new(0.0, omega * c.capacitance)
                }
                Component::Inductor(l) => x[circuit.branch_index(l.branch)],
                Component::VoltageSource(v) => x[circuit.branch_index(v.branch)],
                Component::Diode(d) => {
                    let dc_v = |n: NodeId| {
                        circuit.node_index(n).map(|i| dc_solution[i]).unwrap_or(0.0)
                    };
                    let g = d.conductance(dc_v(d.nodes[0]) - dc_v(d.nodes[1]));
                    (node_v(d.nodes[0]) - node_v(d.nodes[1])) * g
                }
            },

            // Rejected at resolve time for AC sweeps
            ProbeTarget::DiodeInternalNode(_) => zero,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;

    fn build(netlist: &str) -> Circuit {
        Circuit::from_ast(dsl::parse(netlist).unwrap()).unwrap()
    }

    #[test]
    fn test_resolve_node_and_fields() {
        let circuit = build("R R1 vcc v_out 1k\nR v_out gnd 1k\nvcc = 2.5v");

        let node = Probe::resolve(&circuit, "v_out").unwrap();
        assert!(matches!(node.target, ProbeTarget::NodeVoltage(_)));

        let current = Probe::resolve(&circuit, "R1.current").unwrap();
        assert!(matches!(current.target, ProbeTarget::ComponentCurrent(0)));

        let voltage = Probe::resolve(&circuit, "VG1.voltage").unwrap();
        assert!(matches!(voltage.target, ProbeTarget::ComponentVoltage(2)));
    }

    #[test]
    fn test_resolve_rejects_unknown() {
        let circuit = build("R R1 a gnd 1k\na = 1v");
        assert!(Probe::resolve(&circuit, "nope").is_err());
        assert!(Probe::resolve(&circuit, "R9.current").is_err());
        assert!(Probe::resolve(&circuit, "R1.bogus").is_err());
        // internal_node only exists on diodes
        assert!(Probe::resolve(&circuit, "R1.internal_node").is_err());
    }

    #[test]
    fn test_evaluate_resistor_current() {
        let circuit = build("R R1 vcc v_out 1k\nR v_out gnd 1k\nvcc = 2.5v");
        // Hand-built solution: vcc = 2.5, v_out = 1.25, source current
        let x = vec![2.5, 1.25, -1.25e-3];
        let probe = Probe::resolve(&circuit, "R1.current").unwrap();
        assert!((probe.evaluate(&circuit, &x, true) - 1.25e-3).abs() < 1e-12);
    }

    #[test]
    fn test_capacitor_current_is_zero_at_dc() {
        let circuit = build("C c1 v_out gnd 1u i0=0.5\nR v_out gnd 1k\nv_out = 1v");
        let x = vec![1.0, 0.0];
        let probe = Probe::resolve(&circuit, "c1.current").unwrap();
        assert_eq!(probe.evaluate(&circuit, &x, true), 0.0);
        // Transient semantics read the companion state
        assert!((probe.evaluate(&circuit, &x, false) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ground_probe_reads_zero() {
        let circuit = build("R a gnd 1k\na = 1v");
        let probe = Probe::resolve(&circuit, "gnd").unwrap();
        assert_eq!(probe.evaluate(&circuit, &[5.0, 0.0], true), 0.0);
    }
}
