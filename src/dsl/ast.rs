//! Abstract syntax tree types for the netlist language.

use std::collections::HashMap;

/// Complete AST representation of a parsed netlist.
#[derive(Debug, Clone, Default)]
pub struct NetlistAst {
    /// All component declarations, in source order
    pub components: Vec<ComponentDef>,
}

impl NetlistAst {
    /// Create a new empty netlist AST.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A component declaration from the netlist.
#[derive(Debug, Clone)]
pub struct ComponentDef {
    /// Component kind (R, C, L, D, VG)
    pub kind: ComponentKind,
    /// Explicit component name, if one was given
    pub name: Option<String>,
    /// Connected node names, in terminal order
    pub nodes: Vec<String>,
    /// Primary magnitude (resistance, capacitance, inductance, voltage)
    pub value: Option<f64>,
    /// Keyword parameters (`v0`, `i0`, `m`)
    pub params: HashMap<String, f64>,
    /// Source line number for error reporting
    pub line: usize,
}

/// Component kinds supported by the netlist language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Resistor
    Resistor,
    /// Capacitor
    Capacitor,
    /// Inductor
    Inductor,
    /// Exponential diode
    Diode,
    /// Independent voltage source
    VoltageSource,
}

impl ComponentKind {
    /// Parse a component kind from its keyword (case-insensitive).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "R" => Some(Self::Resistor),
            "C" => Some(Self::Capacitor),
            "L" => Some(Self::Inductor),
            "D" => Some(Self::Diode),
            "VG" => Some(Self::VoltageSource),
            _ => None,
        }
    }

    /// Prefix used when auto-naming components of this kind.
    pub fn name_prefix(&self) -> &'static str {
        match self {
            Self::Resistor => "R",
            Self::Capacitor => "C",
            Self::Inductor => "L",
            Self::Diode => "D",
            Self::VoltageSource => "VG",
        }
    }

    /// Whether the declaration takes a positional magnitude.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Self::Diode)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name_prefix())
    }
}
