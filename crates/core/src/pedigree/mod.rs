// Pedigree records: storage, ID cross-referencing, loading and structural checks.

pub mod graph;
pub mod ingest;
pub mod io;
pub mod validate;
pub mod xref;

pub use graph::RecordGraph;
pub use ingest::{IngestOutcome, IngestStats, PedigreeLoader};
pub use validate::{check_structure, ParentTally, SexMap};
pub use xref::{XrefRule, XrefRules, XrefScope};
