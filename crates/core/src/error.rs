use thiserror::Error;

use crate::pedigree::XrefRule;
use crate::traverse::CycleReport;

#[derive(Error, Debug)]
pub enum RefineError {
    #[error("{input} line {line}: expected 3 fields, found {found} in [{content}]")]
    Parse {
        input: String,
        line: usize,
        found: usize,
        content: String,
    },

    #[error(
        "{} ID(s) appeared in both sire and dam columns; use the suggested xref rules for the next run",
        suggestions.len()
    )]
    StructuralCollision { suggestions: Vec<XrefRule> },

    #[error("Pedigree loop detected while sorting ({} cycle(s), first at '{}')",
        cycles.len(),
        cycles.first().map(|c| c.individual.as_str()).unwrap_or("?")
    )]
    TopologicalCycle { cycles: Vec<CycleReport> },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl RefineError {
    /// Process exit status associated with this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            RefineError::Config(_) => 2,
            RefineError::Parse { .. } => 3,
            RefineError::Io(_) | RefineError::Csv(_) => 4,
            RefineError::TopologicalCycle { .. } => 5,
            RefineError::StructuralCollision { .. } => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, RefineError>;
