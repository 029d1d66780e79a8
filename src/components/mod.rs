//! Component models for circuit simulation.
//!
//! This module provides models for all supported circuit components:
//! - Linear: Resistor, Capacitor, Inductor
//! - Sources: Voltage Source
//! - Nonlinear: exponential Diode
//!
//! Each component knows its companion/linearized form; the stamping
//! itself lives in the solver.

mod diode;
mod linear;
mod sources;

pub use diode::Diode;
pub use linear::{Capacitor, Inductor, Resistor};
pub use sources::VoltageSource;

use crate::circuit::{BranchId, ComponentId, NodeId};
use crate::dsl::{ComponentDef, ComponentKind};
use crate::error::{NodalError, Result};

/// A circuit component.
#[derive(Debug, Clone)]
pub enum Component {
    Resistor(Resistor),
    Capacitor(Capacitor),
    Inductor(Inductor),
    VoltageSource(VoltageSource),
    Diode(Diode),
}

impl Component {
    /// Create a component from a netlist definition. `name` is the
    /// resolved (possibly auto-assigned) component name and `nodes` the
    /// interned terminals. Voltage sources and inductors allocate a
    /// branch-current unknown from `branch_counter`.
    pub fn from_def(
        id: ComponentId,
        name: String,
        nodes: [NodeId; 2],
        def: &ComponentDef,
        branch_counter: &mut usize,
    ) -> Result<Self> {
        let value = def.value.ok_or_else(|| {
            NodalError::invalid_component(&name, def.line, format!("{} requires a value", def.kind))
        });
        let param = |key: &str| {
            def.params.get(key).copied().ok_or_else(|| {
                NodalError::invalid_component(
                    &name,
                    def.line,
                    format!("diode requires parameter '{}'", key),
                )
            })
        };

        match def.kind {
            ComponentKind::Resistor => Ok(Component::Resistor(Resistor::new(
                id,
                name.clone(),
                nodes,
                value?,
            )?)),

            ComponentKind::Capacitor => {
                let v0 = def.params.get("v0").copied().unwrap_or(0.0);
                let i0 = def.params.get("i0").copied().unwrap_or(0.0);
                Ok(Component::Capacitor(Capacitor::new(
                    id,
                    name.clone(),
                    nodes,
                    value?,
                    v0,
                    i0,
                )?))
            }

            ComponentKind::Inductor => {
                let v0 = def.params.get("v0").copied().unwrap_or(0.0);
                let i0 = def.params.get("i0").copied().unwrap_or(0.0);
                let branch = BranchId(*branch_counter);
                *branch_counter += 1;
                Ok(Component::Inductor(Inductor::new(
                    id,
                    name.clone(),
                    nodes,
                    value?,
                    branch,
                    v0,
                    i0,
                )?))
            }

            ComponentKind::VoltageSource => {
                let branch = BranchId(*branch_counter);
                *branch_counter += 1;
                Ok(Component::VoltageSource(VoltageSource::new(
                    id,
                    name.clone(),
                    nodes,
                    value?,
                    branch,
                )))
            }

            ComponentKind::Diode => {
                let (i0, m, v0) = (param("i0")?, param("m")?, param("v0")?);
                Ok(Component::Diode(Diode::new(id, name.clone(), nodes, i0, m, v0)?))
            }
        }
    }

    /// Get the component ID.
    pub fn id(&self) -> ComponentId {
        match self {
            Component::Resistor(r) => r.id,
            Component::Capacitor(c) => c.id,
            Component::Inductor(l) => l.id,
            Component::VoltageSource(v) => v.id,
            Component::Diode(d) => d.id,
        }
    }

    /// Get the component name.
    pub fn name(&self) -> &str {
        match self {
            Component::Resistor(r) => &r.name,
            Component::Capacitor(c) => &c.name,
            Component::Inductor(l) => &l.name,
            Component::VoltageSource(v) => &v.name,
            Component::Diode(d) => &d.name,
        }
    }

    /// Get the component kind.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Resistor(_) => ComponentKind::Resistor,
            Component::Capacitor(_) => ComponentKind::Capacitor,
            Component::Inductor(_) => ComponentKind::Inductor,
            Component::VoltageSource(_) => ComponentKind::VoltageSource,
            Component::Diode(_) => ComponentKind::Diode,
        }
    }

    /// Get the terminal nodes.
    pub fn nodes(&self) -> [NodeId; 2] {
        match self {
            Component::Resistor(r) => r.nodes,
            Component::Capacitor(c) => c.nodes,
            Component::Inductor(l) => l.nodes,
            Component::VoltageSource(v) => v.nodes,
            Component::Diode(d) => d.nodes,
        }
    }

    /// Get the branch-current unknown, for components that carry one.
    pub fn branch(&self) -> Option<BranchId> {
        match self {
            Component::Inductor(l) => Some(l.branch),
            Component::VoltageSource(v) => Some(v.branch),
            _ => None,
        }
    }

    /// Check if this component is nonlinear (requires Newton-Raphson
    /// iteration).
    pub fn is_nonlinear(&self) -> bool {
        matches!(self, Component::Diode(_))
    }

    /// Re-read mutated parameters into the stamped caches.
    pub fn refresh(&mut self) {
        if let Component::Resistor(r) = self {
            r.refresh();
        }
    }
}

/// Mutable handle to a component, obtained through
/// `Simulator::get_component_for_modification`. Creating the handle marks
/// the component dirty; the engine re-reads its parameters at the start
/// of the next solve or transient step.
pub struct ComponentHandle<'a> {
    component: &'a mut Component,
}

impl<'a> ComponentHandle<'a> {
    pub(crate) fn new(component: &'a mut Component) -> Self {
        Self { component }
    }

    /// Set the component's primary value: resistance, capacitance,
    /// inductance, or source voltage.
    pub fn set_value(&mut self, value: f64) -> Result<()> {
        match self.component {
            Component::Resistor(r) => r.set_resistance(value),
            Component::Capacitor(c) => c.set_capacitance(value),
            Component::Inductor(l) => l.set_inductance(value),
            Component::VoltageSource(v) => {
                v.set_value(value);
                Ok(())
            }
            Component::Diode(d) => Err(NodalError::invalid_parameter(
                &d.name,
                "value",
                "diode has no single value; set i0, m or v0",
            )),
        }
    }

    /// Set the initial voltage of a capacitor or inductor, applied when
    /// the next transient simulation starts.
    pub fn set_initial_voltage(&mut self, value: f64) -> Result<()> {
        match &mut self.component {
            Component::Capacitor(c) => c.set_initial_voltage(value),
            Component::Inductor(l) => l.set_initial_voltage(value),
            other => Err(NodalError::invalid_parameter(
                other.name(),
                "v0",
                "only capacitors and inductors carry initial conditions",
            )),
        }
    }

    /// Set the initial current of a capacitor or inductor, applied when
    /// the next transient simulation starts.
    pub fn set_initial_current(&mut self, value: f64) -> Result<()> {
        match &mut self.component {
            Component::Capacitor(c) => c.set_initial_current(value),
            Component::Inductor(l) => l.set_initial_current(value),
            other => Err(NodalError::invalid_parameter(
                other.name(),
                "i0",
                "only capacitors and inductors carry initial conditions",
            )),
        }
    }

    /// Set a parameter by its netlist key: `v0`/`i0` for reactive
    /// components (routed through the initial-condition setters), or
    /// `i0`/`m`/`v0` for diodes.
    pub fn set_param(&mut self, param: &str, value: f64) -> Result<()> {
        match &mut self.component {
            Component::Capacitor(c) => match param {
                "v0" => c.set_initial_voltage(value),
                "i0" => c.set_initial_current(value),
                _ => Err(NodalError::invalid_parameter(
                    &c.name,
                    param,
                    "capacitor parameters are v0 and i0",
                )),
            },
            Component::Inductor(l) => match param {
                "v0" => l.set_initial_voltage(value),
                "i0" => l.set_initial_current(value),
                _ => Err(NodalError::invalid_parameter(
                    &l.name,
                    param,
                    "inductor parameters are v0 and i0",
                )),
            },
            Component::Diode(d) => d.set_param(param, value),
            other => Err(NodalError::invalid_parameter(
                other.name(),
                param,
                "component has no named parameters",
            )),
        }
    }
}
