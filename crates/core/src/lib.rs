pub mod error;
pub mod pedigree;
pub mod refine;
pub mod traverse;
pub mod types;

pub use error::{RefineError, Result};
pub use pedigree::{RecordGraph, XrefRule, XrefRules};
pub use refine::{
    AncestorExtract, CyclePolicy, DescendantExtract, Disposition, RefineConfig, RefineMode,
    RefineSummary, Refiner,
};
pub use traverse::GenerationCap;
pub use types::{Identifier, ParentLink, RecordFormat, Sex};
