//! # Nodal Core
//!
//! A lumped-element analog circuit simulator.
//!
//! This library provides:
//! - A small netlist language for describing circuits (R, C, L, diodes,
//!   voltage sources)
//! - Modified Nodal Analysis (MNA) based equation assembly
//! - DC operating-point, fixed-step transient, and small-signal AC
//!   analysis
//! - A mutation protocol for changing component values between transient
//!   continuations
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`dsl`] - Parser for the netlist description language
//! - [`circuit`] - Node table, component set and structural validation
//! - [`components`] - Component models (resistors, capacitors, diodes, ...)
//! - [`solver`] - MNA assembly, LU solving, Newton iteration and the
//!   analysis facade
//!
//! ## Usage
//!
//! ```
//! use nodal_core::Simulator;
//!
//! let netlist = "\
//! R R1 vcc v_out 1k
//! R v_out gnd 1kOhm
//! vcc = 2.5v";
//!
//! let mut sim = Simulator::from_netlist(netlist).unwrap();
//! sim.dc_analysis().unwrap();
//! assert!((sim.get_variable("v_out").unwrap() - 1.25).abs() < 1e-9);
//! ```
//!
//! ## Simulation Method
//!
//! All three analyses share one equation builder. For each solve:
//!
//! 1. Assemble the system matrix A and source vector z by stamping every
//!    component for the active mode
//! 2. Solve Ax = z by dense LU decomposition with partial pivoting
//! 3. For nonlinear elements, iterate with Newton-Raphson until the
//!    solution update falls below tolerance
//!
//! Reactive elements (C, L) are discretized with backward-Euler companion
//! models in transient analysis and stamped as complex admittances in the
//! AC sweep.

pub mod circuit;
pub mod components;
pub mod dsl;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use components::ComponentHandle;
pub use error::{NodalError, Result};
pub use solver::{FrequencyResponse, Simulator, SimulatorConfig, Waveforms};
