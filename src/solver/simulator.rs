//! The analysis facade.
//!
//! [`Simulator`] owns a built circuit together with its MNA system,
//! Newton driver, transient history and analysis state, and exposes the
//! public analysis surface: DC operating point, fixed-step transient with
//! continuations and mid-run parameter mutation, and small-signal AC
//! sweep.

use std::fmt::Write as _;

use num_complex::Complex;

use crate::circuit::{check_dc_paths, Circuit};
use crate::components::{Component, ComponentHandle};
use crate::dsl;
use crate::error::{NodalError, Result};

use super::ac::{self, FrequencyResponse};
use super::mna::{MnaMatrix, Scalar};
use super::newton::NewtonRaphson;
use super::probe::{Probe, ProbeTarget};
use super::stamp::RealMode;
use super::transient::{self, Waveforms};
use super::{ABS_TOLERANCE, DEFAULT_STEP_COUNT, MAX_ITERATIONS, REL_TOLERANCE};

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Maximum Newton-Raphson iterations per solve.
    pub max_iterations: usize,
    /// Absolute Newton convergence tolerance.
    pub abs_tolerance: f64,
    /// Relative Newton convergence tolerance.
    pub rel_tolerance: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            abs_tolerance: ABS_TOLERANCE,
            rel_tolerance: REL_TOLERANCE,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum Newton-Raphson iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the absolute convergence tolerance.
    pub fn with_abs_tolerance(mut self, abs_tolerance: f64) -> Self {
        self.abs_tolerance = abs_tolerance;
        self
    }

    /// Set the relative convergence tolerance.
    pub fn with_rel_tolerance(mut self, rel_tolerance: f64) -> Self {
        self.rel_tolerance = rel_tolerance;
        self
    }
}

/// Analysis state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnalysisState {
    Unsolved,
    DcSolved,
    TransientRunning,
}

/// The circuit simulator.
pub struct Simulator {
    /// The circuit under analysis
    circuit: Circuit,
    /// Real MNA system, holding the most recent DC/transient solve
    matrix: MnaMatrix<f64>,
    /// Newton-Raphson driver
    newton: NewtonRaphson,
    /// Analysis state machine
    state: AnalysisState,
    /// Transient history, present once a transient simulation started
    history: Option<Waveforms>,
    /// Resolved transient probes
    probes: Vec<Probe>,
    /// Current simulation time
    time: f64,
    /// Transient step in effect (0 until one is chosen)
    time_step: f64,
    /// Complex system of the last AC sweep, for diagnostics
    ac_matrix: Option<MnaMatrix<Complex<f64>>>,
}

impl Simulator {
    /// Build a simulator for an already constructed circuit with the
    /// default configuration.
    pub fn new(circuit: Circuit) -> Self {
        Self::with_config(circuit, SimulatorConfig::default())
    }

    /// Build a simulator for an already constructed circuit with a
    /// custom configuration.
    pub fn with_config(circuit: Circuit, config: SimulatorConfig) -> Self {
        let matrix = MnaMatrix::new(circuit.matrix_size());
        let newton = NewtonRaphson::with_config(
            config.max_iterations,
            config.abs_tolerance,
            config.rel_tolerance,
        );
        Self {
            circuit,
            matrix,
            newton,
            state: AnalysisState::Unsolved,
            history: None,
            probes: Vec::new(),
            time: 0.0,
            time_step: 0.0,
            ac_matrix: None,
        }
    }

    /// Build a simulator from netlist text.
    pub fn from_netlist(text: &str) -> Result<Self> {
        Self::from_netlist_with_config(text, SimulatorConfig::default())
    }

    /// Build a simulator from netlist text with a custom configuration.
    pub fn from_netlist_with_config(text: &str, config: SimulatorConfig) -> Result<Self> {
        Ok(Self::with_config(Circuit::from_ast(dsl::parse(text)?)?, config))
    }

    /// Get a reference to the circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The transient time step currently in effect.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// The current simulation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Solve the DC operating point.
    ///
    /// Capacitors are open circuits, inductors shorts; nonlinear devices
    /// iterate from the previous solution (zero on the first call).
    pub fn dc_analysis(&mut self) -> Result<()> {
        self.circuit.acknowledge_mutations();
        check_dc_paths(&self.circuit)?;
        self.newton.solve(&self.circuit, &mut self.matrix, RealMode::Dc)?;
        self.state = AnalysisState::DcSolved;
        self.ac_matrix = None;
        Ok(())
    }

    /// Read a variable from the last solved state. Accepts node names and
    /// the dotted forms `comp.current`, `comp.voltage` and
    /// `comp.internal_node`.
    pub fn get_variable(&self, name: &str) -> Result<f64> {
        let probe = Probe::resolve(&self.circuit, name)?;
        let dc = self.state != AnalysisState::TransientRunning;
        Ok(probe.evaluate(&self.circuit, &self.matrix.x, dc))
    }

    /// Return a mutable handle for a component. Obtaining the handle
    /// marks the component dirty; the engine re-reads its parameters at
    /// the start of the next solve or transient step.
    pub fn get_component_for_modification(&mut self, name: &str) -> Result<ComponentHandle<'_>> {
        self.circuit.get_for_modification(name)
    }

    /// Start a transient simulation over `[t_begin, t_end]`, recording
    /// the named probes.
    ///
    /// The step defaults to `(t_end - t_begin) / 1000`. The `t_begin`
    /// snapshot is recorded exactly once, from the last solved state
    /// (zeros if the circuit was never solved); reactive elements seed
    /// their companion state from their initial conditions. When
    /// `t_end <= t_begin` no steps are taken: this prepares the simulator
    /// for a sequence of
    /// [`continue_transient_simulation`](Self::continue_transient_simulation)
    /// calls.
    pub fn transient_simulation(
        &mut self,
        t_begin: f64,
        t_end: f64,
        probes: &[&str],
    ) -> Result<&Waveforms> {
        let probes = probes
            .iter()
            .map(|name| Probe::resolve(&self.circuit, name))
            .collect::<Result<Vec<_>>>()?;

        transient::reset_reactive_states(&mut self.circuit);
        self.state = AnalysisState::TransientRunning;
        self.ac_matrix = None;
        self.time = t_begin;

        let mut waves = Waveforms::new(probes.iter().map(|p| p.name.clone()).collect());
        waves.record(
            t_begin,
            probes
                .iter()
                .map(|p| p.evaluate(&self.circuit, &self.matrix.x, false)),
        );
        self.probes = probes;
        let history = self.history.insert(waves);

        let span = t_end - t_begin;
        if span > 0.0 {
            self.time_step = span / DEFAULT_STEP_COUNT;
            let steps = DEFAULT_STEP_COUNT as usize;
            self.time = transient::advance_steps(
                &mut self.circuit,
                &mut self.matrix,
                &mut self.newton,
                &self.probes,
                history,
                self.time,
                steps,
                self.time_step,
            )?;
        }

        Ok(history)
    }

    /// Extend a running transient simulation by `duration`, stepping by
    /// exactly `time_step`. Appends `ceil(duration / time_step)` samples
    /// to the existing buffers. Component mutations made since the last
    /// call take effect on the first new step.
    pub fn continue_transient_simulation(
        &mut self,
        duration: f64,
        time_step: f64,
    ) -> Result<&Waveforms> {
        if self.state != AnalysisState::TransientRunning {
            return Err(NodalError::TransientNotStarted);
        }
        if time_step <= 0.0 {
            return Err(NodalError::TimeStepNonPositive { value: time_step });
        }

        self.time_step = time_step;
        let steps = ((duration / time_step) - 1e-9).ceil().max(0.0) as usize;
        let history = self.history.as_mut().ok_or(NodalError::TransientNotStarted)?;

        self.time = transient::advance_steps(
            &mut self.circuit,
            &mut self.matrix,
            &mut self.newton,
            &self.probes,
            history,
            self.time,
            steps,
            time_step,
        )?;

        Ok(history)
    }

    /// Run a small-signal AC sweep over the default grid (1 Hz to 1 MHz,
    /// 20 points per decade), recording the named probes.
    ///
    /// The sweep linearizes about the DC operating point; `dc_analysis`
    /// runs first if the circuit is not DC-solved.
    pub fn ac_sweep(&mut self, probes: &[&str]) -> Result<FrequencyResponse> {
        if self.state != AnalysisState::DcSolved {
            self.dc_analysis()?;
        }

        let probes = probes
            .iter()
            .map(|name| {
                let probe = Probe::resolve(&self.circuit, name)?;
                if matches!(probe.target, ProbeTarget::DiodeInternalNode(_)) {
                    return Err(NodalError::unknown_variable(format!(
                        "{} (internal_node is not an AC observable)",
                        name
                    )));
                }
                Ok(probe)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut matrix = MnaMatrix::new(self.circuit.matrix_size());
        let response = ac::run_sweep(&self.circuit, &mut matrix, &self.matrix.x, &probes)?;
        self.ac_matrix = Some(matrix);
        Ok(response)
    }

    /// Render the post-stamp linear system of the most recent analysis.
    pub fn format_equations(&self) -> String {
        let names = self.circuit.unknown_names();
        if let Some(ac) = &self.ac_matrix {
            format_system(&ac.a, &ac.z, &names)
        } else if self.state == AnalysisState::Unsolved {
            "no analysis has been run".to_string()
        } else {
            format_system(&self.matrix.a, &self.matrix.z, &names)
        }
    }

    /// Print the post-stamp linear system of the most recent analysis.
    pub fn print_equations(&self) {
        println!("{}", self.format_equations());
    }

    /// Render every observable with its value from the last solved state.
    pub fn format_variables(&self) -> String {
        let mut out = String::new();
        let names = self.circuit.unknown_names();
        for (name, value) in names.iter().zip(&self.matrix.x) {
            let _ = writeln!(out, "{} = {:.6e}", name, value);
        }

        let dc = self.state != AnalysisState::TransientRunning;
        for component in &self.circuit.components {
            let mut fields = vec!["current", "voltage"];
            if matches!(component, Component::Diode(_)) {
                fields.push("internal_node");
            }
            for field in fields {
                let name = format!("{}.{}", component.name(), field);
                if let Ok(probe) = Probe::resolve(&self.circuit, &name) {
                    let value = probe.evaluate(&self.circuit, &self.matrix.x, dc);
                    let _ = writeln!(out, "{} = {:.6e}", name, value);
                }
            }
        }
        out
    }

    /// Print every observable with its value from the last solved state.
    pub fn print_all_variables(&self) {
        print!("{}", self.format_variables());
    }
}

/// Render a stamped system row by row, one equation per unknown.
fn format_system<T: Scalar + std::fmt::Display>(a: &[T], z: &[T], names: &[String]) -> String {
    let n = names.len();
    let mut out = String::new();
    for i in 0..n {
        let mut first = true;
        for j in 0..n {
            let value = a[i * n + j];
            if value.is_zero() {
                continue;
            }
            if first {
                let _ = write!(out, "({})*{}", value, names[j]);
                first = false;
            } else {
                let _ = write!(out, " + ({})*{}", value, names[j]);
            }
        }
        if first {
            out.push('0');
        }
        let _ = writeln!(out, " = {}", z[i]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DIVIDER: &str = "R R1 vcc v_out 1k\nR v_out gnd 1kOhm\nvcc = 2.5v";
    const DIODE: &str = "R vcc v1 0.1\nD my_diode v1 gnd i0=1e-5 m=3 v0=0.5\nvcc = 5v";
    const RC: &str = "R R1 vcc v_out 1k\nR v_out gnd 1k\nC v_out gnd 30uF\nvcc = 1V";
    const LOWPASS: &str = "R r1 vcc v_out 1k\nC v_out gnd 1uF\nvcc = 1v";

    #[test]
    fn scenario_resistor_divider() {
        let mut sim = Simulator::from_netlist(DIVIDER).unwrap();
        sim.dc_analysis().unwrap();
        assert!((sim.get_variable("v_out").unwrap() - 1.25).abs() < 1e-9);
        assert!((sim.get_variable("vcc").unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn scenario_diode_resistor() {
        let mut sim = Simulator::from_netlist(DIODE).unwrap();
        sim.dc_analysis().unwrap();

        assert!((sim.get_variable("v1").unwrap() - 4.7018).abs() < 1e-3);
        assert!((sim.get_variable("my_diode.internal_node").unwrap() - 0.3329).abs() < 1e-3);
        assert!((sim.get_variable("my_diode.current").unwrap() - 2.9818).abs() < 1e-3);
    }

    #[test]
    fn scenario_rc_transient() {
        let mut sim = Simulator::from_netlist(RC).unwrap();
        let waves = sim.transient_simulation(0.0, 100e-3, &["v_out"]).unwrap();

        assert_eq!(waves.len(), 1001);
        assert_eq!(waves.times[0], 0.0);

        let v_out = waves.series_for("v_out").unwrap();
        let r_eq = 500.0;
        let c = 30e-6;
        let expected = 0.5 * (1.0 - (-100e-3_f64 / (r_eq * c)).exp());
        assert!((v_out.last().unwrap() - expected).abs() < 1e-3);

        // Default step = span / 1000, reported for reproducibility
        assert!((sim.time_step() - 1e-4).abs() < 1e-12);
    }

    #[test]
    fn scenario_empty_preparation() {
        let mut sim = Simulator::from_netlist(RC).unwrap();
        let waves = sim.transient_simulation(0.0, 0.0, &["v_out"]).unwrap();

        assert_eq!(waves.times, vec![0.0]);
        assert_eq!(waves.series_for("v_out").unwrap(), &[0.0]);
    }

    #[test]
    fn scenario_mutation_protocol() {
        let mut mutated = Simulator::from_netlist(RC).unwrap();
        let mut baseline = Simulator::from_netlist(RC).unwrap();

        mutated.transient_simulation(0.0, 10e-3, &["v_out"]).unwrap();
        baseline.transient_simulation(0.0, 10e-3, &["v_out"]).unwrap();

        mutated
            .get_component_for_modification("R1")
            .unwrap()
            .set_value(2000.0)
            .unwrap();

        let m = mutated
            .continue_transient_simulation(1e-3, 1e-4)
            .unwrap()
            .series_for("v_out")
            .unwrap()
            .to_vec();
        let b = baseline
            .continue_transient_simulation(1e-3, 1e-4)
            .unwrap()
            .series_for("v_out")
            .unwrap()
            .to_vec();

        assert_eq!(m.len(), b.len());
        // With R1 doubled the divider target drops, so the appended
        // samples must fall below the baseline
        for (mv, bv) in m.iter().zip(&b).skip(1001) {
            assert!(mv < bv, "mutation must take effect ({} >= {})", mv, bv);
        }
    }

    #[test]
    fn mutation_requires_the_handle() {
        // Two identical runs, neither touching the component: results
        // must be bit-identical, the effective value unchanged
        let mut a = Simulator::from_netlist(RC).unwrap();
        let mut b = Simulator::from_netlist(RC).unwrap();

        a.transient_simulation(0.0, 0.0, &["v_out"]).unwrap();
        b.transient_simulation(0.0, 0.0, &["v_out"]).unwrap();
        let wa = a.continue_transient_simulation(5e-3, 1e-4).unwrap();
        let wb = b.continue_transient_simulation(5e-3, 1e-4).unwrap();

        assert_eq!(wa.series_for("v_out").unwrap(), wb.series_for("v_out").unwrap());
    }

    #[test]
    fn scenario_ac_sweep() {
        let mut sim = Simulator::from_netlist(LOWPASS).unwrap();
        let response = sim.ac_sweep(&["v_out", "vcc"]).unwrap();

        // Grid point closest to the corner frequency 1/(2*pi*R*C)
        let f_c = 159.155;
        let idx = response
            .frequencies
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - f_c).abs().partial_cmp(&(*b - f_c).abs()).unwrap()
            })
            .map(|(i, _)| i)
            .unwrap();

        let v_out = response.series_for("v_out").unwrap()[idx];
        let v_in = response.series_for("vcc").unwrap()[idx];
        let h = v_out / v_in;

        let magnitude = h.norm();
        assert!(
            (0.70..=0.72).contains(&magnitude),
            "|H(f_c)| = {}",
            magnitude
        );

        let phase_deg = h.arg().to_degrees();
        assert!(
            (-46.0..=-44.0).contains(&phase_deg),
            "arg H(f_c) = {} deg",
            phase_deg
        );
    }

    #[test]
    fn ac_sweep_runs_dc_first() {
        let mut sim = Simulator::from_netlist(LOWPASS).unwrap();
        // No explicit dc_analysis call
        let response = sim.ac_sweep(&["v_out"]).unwrap();
        assert_eq!(response.frequencies.len(), 121);
        // The operating point is now available
        assert!((sim.get_variable("v_out").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ac_sweep_rejects_internal_node_probe() {
        let mut sim = Simulator::from_netlist(DIODE).unwrap();
        let err = sim.ac_sweep(&["my_diode.internal_node"]).unwrap_err();
        assert!(matches!(err, NodalError::UnknownVariable { .. }));
    }

    #[test]
    fn kcl_holds_at_solved_nodes() {
        let mut sim = Simulator::from_netlist(DIODE).unwrap();
        sim.dc_analysis().unwrap();

        // Current into v1 through the resistor equals the diode current
        let i_in = sim.get_variable("R1.current").unwrap();
        let i_out = sim.get_variable("my_diode.current").unwrap();
        assert_relative_eq!(i_in, i_out, max_relative = 1e-8);
    }

    #[test]
    fn dc_analysis_is_idempotent() {
        let mut sim = Simulator::from_netlist(DIODE).unwrap();
        sim.dc_analysis().unwrap();
        let first = sim.get_variable("v1").unwrap();
        sim.dc_analysis().unwrap();
        let second = sim.get_variable("v1").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn transient_continuations_compose() {
        let mut split = Simulator::from_netlist(RC).unwrap();
        let mut whole = Simulator::from_netlist(RC).unwrap();

        split.transient_simulation(0.0, 0.0, &["v_out"]).unwrap();
        split.continue_transient_simulation(5e-3, 1e-4).unwrap();
        split.continue_transient_simulation(5e-3, 1e-4).unwrap();

        whole.transient_simulation(0.0, 0.0, &["v_out"]).unwrap();
        whole.continue_transient_simulation(10e-3, 1e-4).unwrap();

        let ws = split.history.as_ref().unwrap();
        let ww = whole.history.as_ref().unwrap();
        assert_eq!(ws.times, ww.times);
        assert_eq!(ws.series_for("v_out").unwrap(), ww.series_for("v_out").unwrap());
    }

    #[test]
    fn ground_is_pinned() {
        let mut sim = Simulator::from_netlist(DIVIDER).unwrap();
        sim.dc_analysis().unwrap();
        assert_eq!(sim.get_variable("gnd").unwrap(), 0.0);
        assert_eq!(sim.get_variable("0").unwrap(), 0.0);
    }

    #[test]
    fn inductor_is_short_at_dc() {
        let mut sim =
            Simulator::from_netlist("VG s vcc gnd 5v\nL l1 vcc out 1m\nR out gnd 1k").unwrap();
        sim.dc_analysis().unwrap();
        assert!((sim.get_variable("out").unwrap() - 5.0).abs() < 1e-9);
        assert!((sim.get_variable("l1.current").unwrap() - 5e-3).abs() < 1e-9);
        assert!(sim.get_variable("l1.voltage").unwrap().abs() < 1e-9);
    }

    #[test]
    fn rl_transient_matches_analytic_rise() {
        // tau = L/R = 1 ms; i(t) = (V/R)(1 - exp(-t/tau))
        let mut sim =
            Simulator::from_netlist("VG s vcc gnd 1v\nL l1 vcc out 1H\nR out gnd 1k").unwrap();
        sim.transient_simulation(0.0, 0.0, &["l1.current"]).unwrap();
        sim.continue_transient_simulation(5e-3, 1e-5).unwrap();

        let i = *sim
            .history
            .as_ref()
            .unwrap()
            .series_for("l1.current")
            .unwrap()
            .last()
            .unwrap();
        let expected = 1e-3 * (1.0 - (-5.0f64).exp());
        assert!((i - expected).abs() < 1e-5, "i = {}, expected {}", i, expected);
    }

    #[test]
    fn capacitor_initial_voltage_is_honored() {
        // Start the capacitor charged at the divider target: no transient
        let netlist = "R R1 vcc v_out 1k\nR v_out gnd 1k\nC v_out gnd 30uF v0=0.5\nvcc = 1V";
        let mut sim = Simulator::from_netlist(netlist).unwrap();
        sim.transient_simulation(0.0, 0.0, &["v_out"]).unwrap();
        let waves = sim.continue_transient_simulation(2e-3, 1e-4).unwrap();
        for v in waves.series_for("v_out").unwrap().iter().skip(1) {
            assert!((v - 0.5).abs() < 1e-9, "steady start must stay put, got {}", v);
        }
    }

    #[test]
    fn continuation_requires_preparation() {
        let mut sim = Simulator::from_netlist(RC).unwrap();
        let err = sim.continue_transient_simulation(1e-3, 1e-4).unwrap_err();
        assert!(matches!(err, NodalError::TransientNotStarted));
    }

    #[test]
    fn nonpositive_time_step_rejected() {
        let mut sim = Simulator::from_netlist(RC).unwrap();
        sim.transient_simulation(0.0, 0.0, &["v_out"]).unwrap();
        let err = sim.continue_transient_simulation(1e-3, 0.0).unwrap_err();
        assert!(matches!(err, NodalError::TimeStepNonPositive { .. }));
    }

    #[test]
    fn unknown_variable_is_reported() {
        let mut sim = Simulator::from_netlist(DIVIDER).unwrap();
        sim.dc_analysis().unwrap();
        let err = sim.get_variable("nonexistent").unwrap_err();
        assert!(matches!(err, NodalError::UnknownVariable { .. }));
    }

    #[test]
    fn dc_check_reclassifies_singular_circuit() {
        // v2 only reaches ground through the capacitor: no DC path
        let netlist = "R vcc v1 1k\nC v1 v2 1u\nR v2 v3 1k\nR v3 v2 2k\nvcc = 1v";
        let mut sim = Simulator::from_netlist(netlist).unwrap();
        let err = sim.dc_analysis().unwrap_err();
        assert!(matches!(err, NodalError::Structural { .. }));
    }

    #[test]
    fn diagnostics_render_the_last_system() {
        let mut sim = Simulator::from_netlist(DIVIDER).unwrap();
        assert_eq!(sim.format_equations(), "no analysis has been run");

        sim.dc_analysis().unwrap();
        let equations = sim.format_equations();
        assert!(equations.contains("V(v_out)"));
        assert!(equations.contains("= 2.5"));

        let variables = sim.format_variables();
        assert!(variables.contains("V(v_out) = 1.250000e0"));
        assert!(variables.contains("R1.current"));
    }

    #[test]
    fn transient_probe_series_align_with_times() {
        let mut sim = Simulator::from_netlist(RC).unwrap();
        let waves = sim
            .transient_simulation(0.0, 5e-3, &["v_out", "R1.current", "C1.voltage"])
            .unwrap();
        for series in &waves.series {
            assert_eq!(series.len(), waves.times.len());
        }
        // C1 sits across v_out, so the two probes agree
        let v = waves.series_for("v_out").unwrap();
        let vc = waves.series_for("C1.voltage").unwrap();
        for (a, b) in v.iter().zip(vc) {
            assert_eq!(a, b);
        }
    }
}
