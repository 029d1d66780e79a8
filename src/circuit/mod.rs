//! Circuit representation: node table, component set, unknown layout.

mod nodes;
mod types;
mod validate;

pub use nodes::NodeTable;
pub use types::{BranchId, ComponentId, NodeId};
pub use validate::{check_dc_paths, validate_circuit};

use std::collections::HashMap;

use crate::components::{Component, ComponentHandle};
use crate::dsl::NetlistAst;
use crate::error::{NodalError, Result};

/// A complete circuit ready for analysis.
///
/// The structure (nodes, components, unknown layout) is fixed once built;
/// only component parameters may change afterwards, through the
/// dirty-flag mutation protocol.
#[derive(Debug)]
pub struct Circuit {
    /// Node table; ground is `NodeId::GROUND`
    pub nodes: NodeTable,
    /// All components, in netlist order
    pub components: Vec<Component>,
    /// Mutation flags, parallel to `components`
    dirty: Vec<bool>,
    /// Number of branch-current unknowns (voltage sources and inductors)
    num_branches: usize,
}

impl Circuit {
    /// Build a circuit from a parsed netlist.
    pub fn from_ast(ast: NetlistAst) -> Result<Self> {
        let mut nodes = NodeTable::new();
        let mut components = Vec::with_capacity(ast.components.len());
        let mut taken = HashMap::new();
        let mut kind_counts: HashMap<_, usize> = HashMap::new();
        let mut num_branches = 0usize;

        for (idx, def) in ast.components.iter().enumerate() {
            // Auto-name by per-kind ordinal; explicit names join the same
            // sequence so `R R1 ...` followed by an unnamed R yields R2.
            let ordinal = kind_counts.entry(def.kind).or_insert(0);
            *ordinal += 1;
            let name = def
                .name
                .clone()
                .unwrap_or_else(|| format!("{}{}", def.kind.name_prefix(), ordinal));

            if taken.insert(name.clone(), idx).is_some() {
                return Err(NodalError::DuplicateName {
                    name,
                    line: def.line,
                });
            }

            let terminals = [nodes.intern(&def.nodes[0]), nodes.intern(&def.nodes[1])];
            components.push(Component::from_def(
                ComponentId(idx),
                name,
                terminals,
                def,
                &mut num_branches,
            )?);
        }

        let dirty = vec![false; components.len()];
        let circuit = Self {
            nodes,
            components,
            dirty,
            num_branches,
        };
        validate_circuit(&circuit)?;
        Ok(circuit)
    }

    /// Number of nodes, including ground.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of branch-current unknowns.
    pub fn num_branches(&self) -> usize {
        self.num_branches
    }

    /// Total size of the MNA solution vector: non-ground node voltages
    /// plus branch currents.
    pub fn matrix_size(&self) -> usize {
        (self.nodes.len() - 1) + self.num_branches
    }

    /// Matrix index for a node voltage. Ground has none.
    pub fn node_index(&self, node: NodeId) -> Option<usize> {
        if node.is_ground() {
            None
        } else {
            Some(node.0 - 1)
        }
    }

    /// Matrix index for a branch current.
    pub fn branch_index(&self, branch: BranchId) -> usize {
        (self.nodes.len() - 1) + branch.0
    }

    /// Find a node by name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name)
    }

    /// Find a component index by name.
    pub fn find_component(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name() == name)
    }

    /// Whether any component requires Newton-Raphson iteration.
    pub fn has_nonlinear(&self) -> bool {
        self.components.iter().any(|c| c.is_nonlinear())
    }

    /// Return a mutable handle for a component, marking it dirty so the
    /// engine re-reads its parameters at the next solve.
    pub fn get_for_modification(&mut self, name: &str) -> Result<ComponentHandle<'_>> {
        let idx = self
            .find_component(name)
            .ok_or_else(|| NodalError::unknown_variable(name))?;
        self.dirty[idx] = true;
        Ok(ComponentHandle::new(&mut self.components[idx]))
    }

    /// Observe and clear all dirty flags, refreshing the stamped caches
    /// of mutated components. Called at the start of every solve/step.
    pub fn acknowledge_mutations(&mut self) {
        for (component, dirty) in self.components.iter_mut().zip(self.dirty.iter_mut()) {
            if *dirty {
                component.refresh();
                *dirty = false;
            }
        }
    }

    /// Whether a component is currently marked dirty (test hook).
    pub fn is_dirty(&self, idx: usize) -> bool {
        self.dirty[idx]
    }

    /// Human-readable names for every unknown, in matrix order.
    pub fn unknown_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.matrix_size());
        for idx in 1..self.nodes.len() {
            names.push(format!("V({})", self.nodes.name(NodeId(idx))));
        }
        for component in &self.components {
            if component.branch().is_some() {
                names.push(format!("I({})", component.name()));
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;

    fn build(netlist: &str) -> Result<Circuit> {
        Circuit::from_ast(dsl::parse(netlist)?)
    }

    #[test]
    fn test_build_divider() {
        let circuit = build("R R1 vcc v_out 1k\nR v_out gnd 1kOhm\nvcc = 2.5v").unwrap();
        assert_eq!(circuit.num_nodes(), 3); // gnd, vcc, v_out
        assert_eq!(circuit.num_branches(), 1); // the implicit source
        assert_eq!(circuit.matrix_size(), 3);
    }

    #[test]
    fn test_auto_naming_counts_per_kind() {
        let circuit = build("R R1 a b 1k\nR b gnd 1k\nC a gnd 1u\nvcc = 1v\nR a gnd 2k").unwrap();
        let names: Vec<_> = circuit.components.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["R1", "R2", "C1", "VG1", "R3"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = build("R R1 a gnd 1k\nR R1 a gnd 2k").unwrap_err();
        assert!(matches!(err, NodalError::DuplicateName { ref name, .. } if name == "R1"));
    }

    #[test]
    fn test_auto_name_collision_with_explicit() {
        // The unnamed second resistor takes ordinal 2, already claimed
        let err = build("R R2 a gnd 2k\nR a gnd 1k").unwrap_err();
        assert!(matches!(err, NodalError::DuplicateName { ref name, .. } if name == "R2"));
    }

    #[test]
    fn test_unknown_layout() {
        let circuit = build("VG s vcc gnd 5v\nL l1 vcc out 1m\nR out gnd 1k").unwrap();
        // Unknowns: V(vcc), V(out), I(s), I(l1)
        assert_eq!(circuit.matrix_size(), 4);
        let names = circuit.unknown_names();
        assert_eq!(names, vec!["V(vcc)", "V(out)", "I(s)", "I(l1)"]);
    }

    #[test]
    fn test_ground_has_no_index() {
        let circuit = build("R a gnd 1k\na = 1v").unwrap();
        assert_eq!(circuit.node_index(NodeId::GROUND), None);
        let a = circuit.find_node("a").unwrap();
        assert_eq!(circuit.node_index(a), Some(0));
    }

    #[test]
    fn test_mutation_protocol_flags() {
        let mut circuit = build("R R1 a gnd 1k\na = 1v").unwrap();
        assert!(!circuit.is_dirty(0));
        circuit
            .get_for_modification("R1")
            .unwrap()
            .set_value(2000.0)
            .unwrap();
        assert!(circuit.is_dirty(0));
        circuit.acknowledge_mutations();
        assert!(!circuit.is_dirty(0));
    }

    #[test]
    fn test_initial_condition_setters_validate() {
        let mut circuit = build("C c1 a gnd 1u\nR a gnd 1k\na = 1v").unwrap();

        circuit
            .get_for_modification("c1")
            .unwrap()
            .set_initial_voltage(0.25)
            .unwrap();
        match &circuit.components[0] {
            Component::Capacitor(c) => assert!((c.v0 - 0.25).abs() < 1e-15),
            other => panic!("expected a capacitor, got {}", other.name()),
        }

        let err = circuit
            .get_for_modification("c1")
            .unwrap()
            .set_initial_current(f64::NAN)
            .unwrap_err();
        assert!(matches!(err, NodalError::InvalidParameter { .. }));

        // Only reactive components carry initial conditions
        let err = circuit
            .get_for_modification("R1")
            .unwrap()
            .set_initial_voltage(1.0)
            .unwrap_err();
        assert!(matches!(err, NodalError::InvalidParameter { .. }));
    }

    #[test]
    fn test_floating_subcircuit_rejected() {
        let err = build("R a gnd 1k\na = 1v\nR x y 1k").unwrap_err();
        assert!(matches!(err, NodalError::Structural { .. }));
    }

    #[test]
    fn test_missing_ground_rejected() {
        let err = build("R a b 1k\nVG s a b 1v").unwrap_err();
        assert!(matches!(err, NodalError::Structural { .. }));
    }
}
