//! Linear passive components: Resistor, Capacitor, Inductor.

use crate::circuit::{BranchId, ComponentId, NodeId};
use crate::error::{NodalError, Result};

/// A resistor component.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2],
    pub resistance: f64,
    /// Cached conductance (1/R), refreshed when a mutation is acknowledged
    conductance: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(id: ComponentId, name: String, nodes: [NodeId; 2], resistance: f64) -> Result<Self> {
        validate_positive(&name, "resistance", resistance)?;
        Ok(Self {
            id,
            name,
            nodes,
            resistance,
            conductance: 1.0 / resistance,
        })
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        self.conductance
    }

    /// Set the resistance. Takes effect at the next solve, once the
    /// engine acknowledges the mutation.
    pub fn set_resistance(&mut self, resistance: f64) -> Result<()> {
        validate_positive(&self.name, "resistance", resistance)?;
        self.resistance = resistance;
        Ok(())
    }

    /// Re-read the resistance into the stamped cache.
    pub fn refresh(&mut self) {
        self.conductance = 1.0 / self.resistance;
    }
}

/// A capacitor component.
///
/// In transient analysis a capacitor is replaced by its backward-Euler
/// companion model: an equivalent conductance G_eq = C/h in parallel with
/// a current source I_eq = (C/h) * v_state, where v_state is the voltage
/// across the capacitor at the previously accepted step (the initial
/// voltage `v0` before the first step). At DC the capacitor is an open
/// circuit and stamps nothing.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2],
    pub capacitance: f64,
    /// Initial voltage across the capacitor
    pub v0: f64,
    /// Initial current through the capacitor
    pub i0: f64,

    /// Voltage across the capacitor at the last accepted step
    v_state: f64,
    /// Current through the capacitor at the last accepted step
    i_state: f64,
}

impl Capacitor {
    /// Create a new capacitor.
    pub fn new(
        id: ComponentId,
        name: String,
        nodes: [NodeId; 2],
        capacitance: f64,
        v0: f64,
        i0: f64,
    ) -> Result<Self> {
        validate_positive(&name, "capacitance", capacitance)?;
        validate_finite(&name, "v0", v0)?;
        validate_finite(&name, "i0", i0)?;
        Ok(Self {
            id,
            name,
            nodes,
            capacitance,
            v0,
            i0,
            v_state: v0,
            i_state: i0,
        })
    }

    /// Equivalent conductance of the companion model.
    pub fn conductance(&self, h: f64) -> f64 {
        self.capacitance / h
    }

    /// Companion current source carrying the history term.
    pub fn history_current(&self, h: f64) -> f64 {
        self.conductance(h) * self.v_state
    }

    /// Reset the companion state from the initial conditions.
    pub fn reset_state(&mut self) {
        self.v_state = self.v0;
        self.i_state = self.i0;
    }

    /// Accept a step: record the solved voltage and the implied current.
    pub fn update_state(&mut self, v_new: f64, h: f64) {
        self.i_state = self.conductance(h) * (v_new - self.v_state);
        self.v_state = v_new;
    }

    /// Current through the capacitor at the last accepted step.
    pub fn current(&self) -> f64 {
        self.i_state
    }

    /// Set the capacitance.
    pub fn set_capacitance(&mut self, capacitance: f64) -> Result<()> {
        validate_positive(&self.name, "capacitance", capacitance)?;
        self.capacitance = capacitance;
        Ok(())
    }

    /// Set the initial voltage, applied when the next transient starts.
    pub fn set_initial_voltage(&mut self, v0: f64) -> Result<()> {
        validate_finite(&self.name, "v0", v0)?;
        self.v0 = v0;
        Ok(())
    }

    /// Set the initial current, applied when the next transient starts.
    pub fn set_initial_current(&mut self, i0: f64) -> Result<()> {
        validate_finite(&self.name, "i0", i0)?;
        self.i0 = i0;
        Ok(())
    }
}

/// An inductor component.
///
/// The inductor carries a branch-current unknown in every analysis mode.
/// At DC its branch row enforces V(a) - V(b) = 0 (a short). In transient
/// analysis the backward-Euler companion is expressed in Thevenin form on
/// the branch row: V(a) - V(b) - (L/h) I = -[(L/h) i_state + v_state].
/// The initial voltage enters the first step only; afterwards the state
/// is the solved branch current.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2],
    pub inductance: f64,
    pub branch: BranchId,
    /// Initial voltage across the inductor
    pub v0: f64,
    /// Initial current through the inductor
    pub i0: f64,

    /// Current through the inductor at the last accepted step
    i_state: f64,
    /// Initial-voltage term, zeroed once folded into the first step
    v_state: f64,
}

impl Inductor {
    /// Create a new inductor.
    pub fn new(
        id: ComponentId,
        name: String,
        nodes: [NodeId; 2],
        inductance: f64,
        branch: BranchId,
        v0: f64,
        i0: f64,
    ) -> Result<Self> {
        validate_positive(&name, "inductance", inductance)?;
        validate_finite(&name, "v0", v0)?;
        validate_finite(&name, "i0", i0)?;
        Ok(Self {
            id,
            name,
            nodes,
            inductance,
            branch,
            v0,
            i0,
            i_state: i0,
            v_state: v0,
        })
    }

    /// Equivalent resistance of the companion model.
    pub fn resistance(&self, h: f64) -> f64 {
        self.inductance / h
    }

    /// Companion voltage carrying the history term.
    pub fn history_voltage(&self, h: f64) -> f64 {
        self.resistance(h) * self.i_state + self.v_state
    }

    /// Reset the companion state from the initial conditions.
    pub fn reset_state(&mut self) {
        self.i_state = self.i0;
        self.v_state = self.v0;
    }

    /// Accept a step: record the solved branch current.
    pub fn update_state(&mut self, i_new: f64) {
        self.i_state = i_new;
        self.v_state = 0.0;
    }

    /// Current through the inductor at the last accepted step.
    pub fn current(&self) -> f64 {
        self.i_state
    }

    /// Set the inductance.
    pub fn set_inductance(&mut self, inductance: f64) -> Result<()> {
        validate_positive(&self.name, "inductance", inductance)?;
        self.inductance = inductance;
        Ok(())
    }

    /// Set the initial voltage, applied when the next transient starts.
    pub fn set_initial_voltage(&mut self, v0: f64) -> Result<()> {
        validate_finite(&self.name, "v0", v0)?;
        self.v0 = v0;
        Ok(())
    }

    /// Set the initial current, applied when the next transient starts.
    pub fn set_initial_current(&mut self, i0: f64) -> Result<()> {
        validate_finite(&self.name, "i0", i0)?;
        self.i0 = i0;
        Ok(())
    }
}

fn validate_positive(component: &str, param: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NodalError::invalid_parameter(
            component,
            param,
            format!("must be positive, got {}", value),
        ))
    }
}

fn validate_finite(component: &str, param: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NodalError::invalid_parameter(
            component,
            param,
            format!("must be finite, got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new(
            ComponentId(0),
            "R1".to_string(),
            [NodeId(1), NodeId(0)],
            1000.0,
        )
        .unwrap();
        assert!((r.conductance() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_resistor_rejects_nonpositive() {
        let r = Resistor::new(
            ComponentId(0),
            "R1".to_string(),
            [NodeId(1), NodeId(0)],
            -5.0,
        );
        assert!(matches!(r, Err(NodalError::InvalidParameter { .. })));
    }

    #[test]
    fn test_resistor_mutation_updates_cache_on_refresh() {
        let mut r = Resistor::new(
            ComponentId(0),
            "R1".to_string(),
            [NodeId(1), NodeId(0)],
            1000.0,
        )
        .unwrap();
        r.set_resistance(2000.0).unwrap();
        r.refresh();
        assert!((r.conductance() - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn test_capacitor_companion_model() {
        let mut c = Capacitor::new(
            ComponentId(0),
            "C1".to_string(),
            [NodeId(1), NodeId(0)],
            30e-6,
            0.0,
            0.0,
        )
        .unwrap();
        let h = 1e-4;

        // G_eq = C/h = 30e-6 / 1e-4 = 0.3 S
        assert!((c.conductance(h) - 0.3).abs() < 1e-12);
        assert!(c.history_current(h).abs() < 1e-12);

        c.update_state(1.0, h);
        assert!((c.history_current(h) - 0.3).abs() < 1e-12);
        assert!((c.current() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_capacitor_initial_condition_setters_validate() {
        let mut c = Capacitor::new(
            ComponentId(0),
            "C1".to_string(),
            [NodeId(1), NodeId(0)],
            1e-6,
            0.0,
            0.0,
        )
        .unwrap();

        // Negative initial conditions are legitimate
        c.set_initial_voltage(-2.0).unwrap();
        assert!((c.v0 + 2.0).abs() < 1e-15);
        c.set_initial_current(0.25).unwrap();
        assert!((c.i0 - 0.25).abs() < 1e-15);

        assert!(matches!(
            c.set_initial_voltage(f64::NAN),
            Err(NodalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            c.set_initial_current(f64::INFINITY),
            Err(NodalError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_capacitor_rejects_nonfinite_initial_conditions() {
        let c = Capacitor::new(
            ComponentId(0),
            "C1".to_string(),
            [NodeId(1), NodeId(0)],
            1e-6,
            f64::INFINITY,
            0.0,
        );
        assert!(matches!(c, Err(NodalError::InvalidParameter { .. })));
    }

    #[test]
    fn test_capacitor_initial_conditions_seed_state() {
        let mut c = Capacitor::new(
            ComponentId(0),
            "C1".to_string(),
            [NodeId(1), NodeId(0)],
            1e-6,
            2.0,
            0.5,
        )
        .unwrap();
        c.reset_state();
        assert!((c.history_current(1e-3) - 1e-3 * 2.0).abs() < 1e-12);
        assert!((c.current() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_inductor_companion_model() {
        let mut l = Inductor::new(
            ComponentId(0),
            "L1".to_string(),
            [NodeId(1), NodeId(2)],
            50e-6,
            BranchId(0),
            0.0,
            1.0,
        )
        .unwrap();
        let h = 1e-6;

        // R_eq = L/h = 50e-6 / 1e-6 = 50 ohm
        assert!((l.resistance(h) - 50.0).abs() < 1e-12);
        // History carries the initial current
        assert!((l.history_voltage(h) - 50.0).abs() < 1e-9);

        l.update_state(2.0);
        assert!((l.history_voltage(h) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_inductor_initial_voltage_folds_once() {
        let mut l = Inductor::new(
            ComponentId(0),
            "L1".to_string(),
            [NodeId(1), NodeId(2)],
            1e-3,
            BranchId(0),
            0.5,
            0.0,
        )
        .unwrap();
        let h = 1e-6;
        assert!((l.history_voltage(h) - 0.5).abs() < 1e-12);
        l.update_state(0.1);
        // v0 no longer contributes after the first accepted step
        assert!((l.history_voltage(h) - 0.1 * l.resistance(h)).abs() < 1e-9);
    }
}
