//! Nodal - netlist-driven analog circuit analysis.
//!
//! # Usage
//!
//! ```bash
//! nodal op circuit.net
//! nodal tran circuit.net --stop 10m --probe v_out
//! nodal ac circuit.net --probe v_out --probe vcc
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nodal_core::{circuit::Circuit, dsl, error::Result, Simulator};

/// Lumped-element analog circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve the DC operating point and print every variable
    Op {
        /// Path to the netlist file
        #[arg(value_name = "NETLIST")]
        netlist: PathBuf,

        /// Also print the stamped equations
        #[arg(long)]
        equations: bool,
    },

    /// Run a transient simulation and print the recorded waveforms
    Tran {
        /// Path to the netlist file
        #[arg(value_name = "NETLIST")]
        netlist: PathBuf,

        /// Stop time in seconds
        #[arg(long)]
        stop: f64,

        /// Time step in seconds (defaults to stop/1000)
        #[arg(long)]
        step: Option<f64>,

        /// Probe names to record (repeatable)
        #[arg(long = "probe")]
        probes: Vec<String>,
    },

    /// Run an AC sweep and print magnitude/phase per frequency
    Ac {
        /// Path to the netlist file
        #[arg(value_name = "NETLIST")]
        netlist: PathBuf,

        /// Probe names to record (repeatable)
        #[arg(long = "probe")]
        probes: Vec<String>,
    },
}

fn load(path: &PathBuf) -> Result<Simulator> {
    let ast = dsl::parse_file(path)?;
    let circuit = Circuit::from_ast(ast)?;
    Ok(Simulator::new(circuit))
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Op { netlist, equations } => {
            let mut sim = load(&netlist)?;
            sim.dc_analysis()?;
            if equations {
                sim.print_equations();
                println!();
            }
            sim.print_all_variables();
        }

        Command::Tran {
            netlist,
            stop,
            step,
            probes,
        } => {
            let mut sim = load(&netlist)?;
            let names: Vec<&str> = probes.iter().map(String::as_str).collect();

            let waves = match step {
                Some(h) => {
                    sim.transient_simulation(0.0, 0.0, &names)?;
                    sim.continue_transient_simulation(stop, h)?
                }
                None => sim.transient_simulation(0.0, stop, &names)?,
            };

            print!("time");
            for probe in waves.probes() {
                print!("\t{}", probe);
            }
            println!();
            for (k, t) in waves.times.iter().enumerate() {
                print!("{:.6e}", t);
                for series in &waves.series {
                    print!("\t{:.6e}", series[k]);
                }
                println!();
            }
        }

        Command::Ac { netlist, probes } => {
            let mut sim = load(&netlist)?;
            let names: Vec<&str> = probes.iter().map(String::as_str).collect();
            let response = sim.ac_sweep(&names)?;

            print!("freq");
            for probe in response.probes() {
                print!("\t|{}|\targ({})", probe, probe);
            }
            println!();
            for (k, f) in response.frequencies.iter().enumerate() {
                print!("{:.6e}", f);
                for series in &response.series {
                    let v = series[k];
                    print!("\t{:.6e}\t{:.3}", v.norm(), v.arg().to_degrees());
                }
                println!();
            }
        }
    }

    Ok(())
}
