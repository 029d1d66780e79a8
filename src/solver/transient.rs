//! Transient history buffers and the fixed-step integrator loop.

use crate::circuit::Circuit;
use crate::components::Component;
use crate::error::Result;

use super::mna::MnaMatrix;
use super::newton::NewtonRaphson;
use super::probe::Probe;
use super::stamp::RealMode;

/// Recorded transient waveforms: a shared time axis plus one series per
/// probe. Buffers grow monotonically across continuation calls.
#[derive(Debug, Clone)]
pub struct Waveforms {
    /// Timestamps, starting at the simulation begin time
    pub times: Vec<f64>,
    probe_names: Vec<String>,
    /// One value series per probe, parallel to `times`
    pub series: Vec<Vec<f64>>,
}

impl Waveforms {
    pub(crate) fn new(probe_names: Vec<String>) -> Self {
        let series = vec![Vec::new(); probe_names.len()];
        Self {
            times: Vec::new(),
            probe_names,
            series,
        }
    }

    /// Names of the recorded probes, in request order.
    pub fn probes(&self) -> &[String] {
        &self.probe_names
    }

    /// The series recorded for a probe name.
    pub fn series_for(&self, name: &str) -> Option<&[f64]> {
        let idx = self.probe_names.iter().position(|p| p == name)?;
        Some(&self.series[idx])
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub(crate) fn record(&mut self, t: f64, values: impl IntoIterator<Item = f64>) {
        self.times.push(t);
        for (series, value) in self.series.iter_mut().zip(values) {
            series.push(value);
        }
    }
}

/// Advance the circuit by `steps` backward-Euler steps of size `h`,
/// appending probe samples to `waves`. Returns the new simulation time.
/// On failure the buffers reflect the last successful step.
pub(crate) fn advance_steps(
    circuit: &mut Circuit,
    matrix: &mut MnaMatrix<f64>,
    newton: &mut NewtonRaphson,
    probes: &[Probe],
    waves: &mut Waveforms,
    t_start: f64,
    steps: usize,
    h: f64,
) -> Result<f64> {
    let mut t = t_start;
    for _ in 0..steps {
        // Observe mutations made between continuation calls
        circuit.acknowledge_mutations();

        newton.solve(circuit, matrix, RealMode::Transient { h })?;
        update_reactive_states(circuit, &matrix.x, h);

        t += h;
        waves.record(t, probes.iter().map(|p| p.evaluate(circuit, &matrix.x, false)));
    }
    Ok(t)
}

/// Accept a step: fold the solved voltages/currents into the companion
/// state of every reactive element.
fn update_reactive_states(circuit: &mut Circuit, x: &[f64], h: f64) {
    let offset = circuit.num_nodes() - 1;
    for component in &mut circuit.components {
        match component {
            Component::Capacitor(c) => {
                let v1 = if c.nodes[0].is_ground() {
                    0.0
                } else {
                    x[c.nodes[0].0 - 1]
                };
                let v2 = if c.nodes[1].is_ground() {
                    0.0
                } else {
                    x[c.nodes[1].0 - 1]
                };
                c.update_state(v1 - v2, h);
            }

            Component::Inductor(l) => {
                l.update_state(x[offset + l.branch.0]);
            }

            _ => {}
        }
    }
}

/// Seed every reactive element's companion state from its initial
/// conditions. Called when a transient simulation starts.
pub(crate) fn reset_reactive_states(circuit: &mut Circuit) {
    for component in &mut circuit.components {
        match component {
            Component::Capacitor(c) => c.reset_state(),
            Component::Inductor(l) => l.reset_state(),
            _ => {}
        }
    }
}
