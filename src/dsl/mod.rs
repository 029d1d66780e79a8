//! Parser for the netlist description language.
//!
//! The language is line-oriented and whitespace-separated; `#` and `;`
//! start comments. Keywords and unit suffixes are case-insensitive.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist    = { line }
//! line       = comment | component | assignment | empty
//! component  = kind [name] node node { param }
//! assignment = node '=' magnitude          ; implicit source to ground
//!
//! kind       = "R" | "C" | "L" | "D" | "VG"
//! name       = identifier                  ; must not start with a digit
//! node       = identifier | "0" | "gnd"
//! param      = key '=' magnitude           ; v0/i0 for C and L; i0/m/v0 for D
//! magnitude  = number [si_prefix] [unit]
//!
//! si_prefix  = 'p' | 'n' | 'u' | 'm' | 'k' | 'M'
//! unit       = "ohm" | 'F' | 'H' | 'V'
//! ```
//!
//! # Examples
//!
//! ```text
//! # resistor divider driven by a 2.5 V source
//! R R1 vcc v_out 1k
//! R v_out gnd 1kOhm
//! vcc = 2.5v
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::{ComponentDef, ComponentKind, NetlistAst};
pub use lexer::{parse_magnitude, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a netlist string into an AST.
pub fn parse(input: &str) -> Result<NetlistAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer);
    parser.parse()
}

/// Parse a netlist file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<NetlistAst> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::error::NodalError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;
    parse(&content)
}
