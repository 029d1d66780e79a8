//! Small-signal AC sweep over a logarithmic frequency grid.

use num_complex::Complex;

use crate::circuit::Circuit;
use crate::error::Result;

use super::mna::MnaMatrix;
use super::probe::Probe;
use super::stamp::stamp_ac_system;

/// Sweep start frequency in Hz.
pub const FREQ_START: f64 = 1.0;

/// Sweep stop frequency in Hz.
pub const FREQ_STOP: f64 = 1e6;

/// Grid density of the logarithmic sweep.
pub const POINTS_PER_DECADE: usize = 20;

/// The complex response of each probe across the frequency grid.
#[derive(Debug, Clone)]
pub struct FrequencyResponse {
    /// Sweep frequencies in Hz
    pub frequencies: Vec<f64>,
    probe_names: Vec<String>,
    /// One complex series per probe, parallel to `frequencies`
    pub series: Vec<Vec<Complex<f64>>>,
}

impl FrequencyResponse {
    /// Names of the recorded probes, in request order.
    pub fn probes(&self) -> &[String] {
        &self.probe_names
    }

    /// The complex series recorded for a probe name.
    pub fn series_for(&self, name: &str) -> Option<&[Complex<f64>]> {
        let idx = self.probe_names.iter().position(|p| p == name)?;
        Some(&self.series[idx])
    }
}

/// The default logarithmic grid: 1 Hz to 1 MHz at 20 points per decade.
pub fn frequency_grid() -> Vec<f64> {
    let decades = (FREQ_STOP / FREQ_START).log10();
    let count = (decades * POINTS_PER_DECADE as f64).round() as usize;
    (0..=count)
        .map(|i| FREQ_START * 10f64.powf(i as f64 / POINTS_PER_DECADE as f64))
        .collect()
}

/// Run the sweep: per frequency, build the complex system linearized at
/// the DC operating point, solve it, and record the probe values. The
/// matrix is left holding the system of the final frequency.
pub(crate) fn run_sweep(
    circuit: &Circuit,
    matrix: &mut MnaMatrix<Complex<f64>>,
    dc_solution: &[f64],
    probes: &[Probe],
) -> Result<FrequencyResponse> {
    let frequencies = frequency_grid();
    let mut series = vec![Vec::with_capacity(frequencies.len()); probes.len()];

    for &f in &frequencies {
        let omega = 2.0 * std::f64::consts::PI * f;
        matrix.clear();
        stamp_ac_system(circuit, matrix, omega, dc_solution);
        matrix.factor()?;
        matrix.solve()?;

        for (out, probe) in series.iter_mut().zip(probes) {
            out.push(probe.evaluate_ac(circuit, &matrix.x, omega, dc_solution));
        }
    }

    Ok(FrequencyResponse {
        frequencies,
        probe_names: probes.iter().map(|p| p.name.clone()).collect(),
        series,
    })
}
