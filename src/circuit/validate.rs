//! Circuit validation: structural checks ahead of analysis.

use crate::components::Component;
use crate::error::{NodalError, Result};

use super::{Circuit, NodeId};

/// Validate a freshly built circuit.
///
/// Checks:
/// - the circuit has at least one component
/// - some component references ground
/// - every node is connected to ground through some component chain
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.components.is_empty() {
        return Err(NodalError::structural("circuit has no components"));
    }

    let touches_ground = circuit
        .components
        .iter()
        .any(|c| c.nodes().iter().any(NodeId::is_ground));
    if !touches_ground {
        return Err(NodalError::structural(
            "circuit has no ground reference (use 'gnd' or '0')",
        ));
    }

    if let Some(node) = first_unreachable(circuit, true) {
        return Err(NodalError::structural(format!(
            "floating subcircuit: node '{}' has no path to ground",
            circuit.nodes.name(node)
        )));
    }

    Ok(())
}

/// Check that every node keeps a DC path to ground once capacitors are
/// treated as open circuits. Run before a DC operating-point solve so the
/// failure surfaces as a structural diagnosis instead of a singular
/// matrix.
pub fn check_dc_paths(circuit: &Circuit) -> Result<()> {
    if let Some(node) = first_unreachable(circuit, false) {
        return Err(NodalError::structural(format!(
            "node '{}' has no DC path to ground",
            circuit.nodes.name(node)
        )));
    }
    Ok(())
}

/// Breadth-first search from ground over component terminal pairs.
/// Returns the first node (in id order) that cannot be reached.
fn first_unreachable(circuit: &Circuit, include_capacitors: bool) -> Option<NodeId> {
    let n = circuit.num_nodes();
    let mut reached = vec![false; n];
    reached[0] = true;

    let mut frontier = vec![0usize];
    while let Some(current) = frontier.pop() {
        for component in &circuit.components {
            if !include_capacitors && matches!(component, Component::Capacitor(_)) {
                continue;
            }
            let [a, b] = component.nodes();
            let (a, b) = (a.0, b.0);
            if a == current && !reached[b] {
                reached[b] = true;
                frontier.push(b);
            }
            if b == current && !reached[a] {
                reached[a] = true;
                frontier.push(a);
            }
        }
    }

    reached
        .iter()
        .position(|&ok| !ok)
        .map(NodeId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;

    fn build(netlist: &str) -> Circuit {
        Circuit::from_ast(dsl::parse(netlist).unwrap()).unwrap()
    }

    #[test]
    fn test_dc_path_through_resistor_ok() {
        let circuit = build("R a gnd 1k\nC a gnd 1u\na = 1v");
        assert!(check_dc_paths(&circuit).is_ok());
    }

    #[test]
    fn test_capacitor_only_node_fails_dc_check() {
        // b hangs off a capacitor; fine for transient, singular at DC
        let circuit = build("R a gnd 1k\nC a b 1u\nR b x 1k\nR x b 2k\na = 1v");
        let err = check_dc_paths(&circuit).unwrap_err();
        assert!(matches!(err, NodalError::Structural { .. }));
    }

    #[test]
    fn test_inductor_provides_dc_path() {
        let circuit = build("R a gnd 1k\nL a b 1m\nR b gnd 1k\na = 1v");
        assert!(check_dc_paths(&circuit).is_ok());
    }
}
