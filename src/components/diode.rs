//! Exponential diode model.
//!
//! Device equation:
//!   I = i0 * exp(m * (V - v0))
//!
//! with V = V(anode) - V(cathode). For Newton-Raphson iteration the
//! device is linearized about the current operating point:
//!   I(V) ~= I(V*) + g * (V - V*),  g = dI/dV = m * I(V*)
//!
//! and stamped as the conductance g in parallel with the current source
//! I(V*) - g * V*.

use crate::circuit::{ComponentId, NodeId};
use crate::error::{NodalError, Result};

/// Cap on the exponent argument so intermediate Newton iterates cannot
/// overflow to infinity.
const EXP_ARG_LIMIT: f64 = 700.0;

/// An exponential diode.
#[derive(Debug, Clone)]
pub struct Diode {
    pub id: ComponentId,
    pub name: String,
    pub nodes: [NodeId; 2], // [anode, cathode]
    /// Scale current
    pub i0: f64,
    /// Exponential slope (1/V)
    pub m: f64,
    /// Voltage offset
    pub v0: f64,
}

impl Diode {
    /// Create a new diode.
    pub fn new(
        id: ComponentId,
        name: String,
        nodes: [NodeId; 2],
        i0: f64,
        m: f64,
        v0: f64,
    ) -> Result<Self> {
        let diode = Self {
            id,
            name,
            nodes,
            i0,
            m,
            v0,
        };
        diode.validate()?;
        Ok(diode)
    }

    fn validate(&self) -> Result<()> {
        if !(self.i0 > 0.0 && self.i0.is_finite()) {
            return Err(NodalError::invalid_parameter(
                &self.name,
                "i0",
                format!("must be positive, got {}", self.i0),
            ));
        }
        if !(self.m > 0.0 && self.m.is_finite()) {
            return Err(NodalError::invalid_parameter(
                &self.name,
                "m",
                format!("must be positive, got {}", self.m),
            ));
        }
        Ok(())
    }

    /// Diode current at a given terminal voltage.
    pub fn current(&self, v: f64) -> f64 {
        let arg = (self.m * (v - self.v0)).min(EXP_ARG_LIMIT);
        self.i0 * arg.exp()
    }

    /// Conductance dI/dV at a given terminal voltage.
    pub fn conductance(&self, v: f64) -> f64 {
        self.m * self.current(v)
    }

    /// Linearized model at the operating point: (g, i_eq) such that
    /// I ~= g * V + i_eq.
    pub fn linearize(&self, v_op: f64) -> (f64, f64) {
        let g = self.conductance(v_op);
        let i_eq = self.current(v_op) - g * v_op;
        (g, i_eq)
    }

    /// Internal-node voltage observable: V(anode) minus the nonlinear
    /// part of the drop, leaving the linear-equivalent share I/g above
    /// the cathode.
    pub fn internal_node_voltage(&self, v_anode: f64, v_cathode: f64) -> f64 {
        let v = v_anode - v_cathode;
        let i = self.current(v);
        let g = self.conductance(v);
        v_anode - (v - i / g)
    }

    /// Set a named parameter (`i0`, `m` or `v0`).
    pub fn set_param(&mut self, param: &str, value: f64) -> Result<()> {
        let old = (self.i0, self.m, self.v0);
        match param {
            "i0" => self.i0 = value,
            "m" => self.m = value,
            "v0" => self.v0 = value,
            _ => {
                return Err(NodalError::invalid_parameter(
                    &self.name,
                    param,
                    "diode parameters are i0, m and v0",
                ))
            }
        }
        if let Err(e) = self.validate() {
            (self.i0, self.m, self.v0) = old;
            return Err(e);
        }
        Ok(())
    }
}
