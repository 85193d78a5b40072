// src/display/mod.rs
//! Display modules for different interfaces

pub mod terminal;

pub use terminal::{StatusFrame, TerminalDisplay};

/// Whether stdout is an interactive terminal worth redrawing.
pub fn is_interactive() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
