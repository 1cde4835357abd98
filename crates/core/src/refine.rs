use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{RefineError, Result};
use crate::pedigree::io::{open_reader, write_ids, write_records, write_sex_table};
use crate::pedigree::{check_structure, IngestStats, PedigreeLoader, RecordGraph, SexMap, XrefRules};
use crate::traverse::{
    sequence, AncestorClosure, CycleReport, DescendantClosure, GenerationCap, Sequence,
};
use crate::types::RecordFormat;

/// Which closure a run extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefineMode {
    /// Ancestors of the seeds, ordered parents first.
    #[default]
    Ancestors,
    /// Descendants of the seeds, one ID per line.
    Descendants,
}

/// What to do with an ancestor ordering that contains a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Write nothing and fail.
    #[default]
    Abort,
    /// Write the ordering to the primary output anyway.
    Emit,
    /// Write the ordering to a side file and fail.
    SideFile,
}

impl FromStr for CyclePolicy {
    type Err = RefineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(CyclePolicy::Abort),
            "emit" => Ok(CyclePolicy::Emit),
            "side-file" | "sidefile" | "file" => Ok(CyclePolicy::SideFile),
            other => Err(RefineError::Config(format!(
                "unknown cycle policy '{}'; use 'abort', 'emit' or 'side-file'",
                other
            ))),
        }
    }
}

impl fmt::Display for CyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CyclePolicy::Abort => "abort",
            CyclePolicy::Emit => "emit",
            CyclePolicy::SideFile => "side-file",
        })
    }
}

/// Where an ancestor ordering should be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Primary,
    SideFile,
}

/// Options for a refinement run.
#[derive(Debug, Clone)]
pub struct RefineConfig {
    mode: RefineMode,
    generation_cap: GenerationCap,
    input_delimiter: char,
    output_format: RecordFormat,
    cycle_policy: CyclePolicy,
}

impl RefineConfig {
    /// Ancestor mode, unbounded, comma-separated in and out, `0` for unknown.
    pub fn new() -> Self {
        Self {
            mode: RefineMode::Ancestors,
            generation_cap: GenerationCap::unbounded(),
            input_delimiter: ',',
            output_format: RecordFormat::default(),
            cycle_policy: CyclePolicy::Abort,
        }
    }

    pub fn mode(mut self, mode: RefineMode) -> Self {
        self.mode = mode;
        self
    }

    /// Generations to follow from each seed; 0 means unbounded.
    pub fn generation_cap(mut self, generations: usize) -> Self {
        self.generation_cap = GenerationCap::new(generations);
        self
    }

    pub fn input_delimiter(mut self, delimiter: char) -> Self {
        self.input_delimiter = delimiter;
        self
    }

    pub fn output_delimiter(mut self, delimiter: char) -> Self {
        self.output_format.delimiter = delimiter;
        self
    }

    /// Token written for unknown parents (default `0`).
    pub fn missing_out(mut self, token: &str) -> Self {
        self.output_format.missing = token.to_string();
        self
    }

    pub fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    pub fn get_mode(&self) -> RefineMode {
        self.mode
    }

    pub fn get_generation_cap(&self) -> GenerationCap {
        self.generation_cap
    }

    pub fn get_cycle_policy(&self) -> CyclePolicy {
        self.cycle_policy
    }

    pub fn output_format(&self) -> &RecordFormat {
        &self.output_format
    }

    /// # Errors
    /// Returns [`RefineError::Config`] for a non-ASCII delimiter or an empty
    /// missing-value token.
    pub fn validate(&self) -> Result<()> {
        for (what, delimiter) in [
            ("input", self.input_delimiter),
            ("output", self.output_format.delimiter),
        ] {
            if !delimiter.is_ascii() {
                return Err(RefineError::Config(format!(
                    "{} delimiter '{}' must be a single ASCII character",
                    what, delimiter
                )));
            }
        }
        if self.output_format.missing.is_empty() {
            return Err(RefineError::Config(
                "missing-value token must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered ancestors of a seed list.
#[derive(Debug, Clone)]
pub struct AncestorExtract {
    pub links: RecordGraph,
    pub sequence: Sequence,
    pub loop_stems: Vec<String>,
    pub truncated: usize,
}

impl AncestorExtract {
    /// Decide where this ordering goes under `policy`.
    ///
    /// # Errors
    /// Returns [`RefineError::TopologicalCycle`] if the ordering has a loop
    /// and the policy is [`CyclePolicy::Abort`].
    pub fn disposition(&self, policy: CyclePolicy) -> Result<Disposition> {
        if !self.sequence.has_cycles() {
            return Ok(Disposition::Primary);
        }
        match policy {
            CyclePolicy::Emit => {
                log::warn!(
                    "writing output pedigree with {} loop(s)",
                    self.sequence.cycles.len()
                );
                Ok(Disposition::Primary)
            }
            CyclePolicy::SideFile => Ok(Disposition::SideFile),
            CyclePolicy::Abort => Err(self.cycle_error()),
        }
    }

    pub fn cycle_error(&self) -> RefineError {
        RefineError::TopologicalCycle {
            cycles: self.sequence.cycles.clone(),
        }
    }

    /// Write `id,sire,dam` records, parents first.
    pub fn write_records<W: Write>(&self, writer: W, format: &RecordFormat) -> Result<()> {
        write_records(writer, &self.links, self.sequence.ids(), format)
    }

    /// Write the inferred sex of every output individual.
    pub fn write_sex_table<W: Write>(&self, writer: W, sexes: &SexMap) -> Result<()> {
        write_sex_table(writer, self.sequence.ids(), sexes)
    }
}

/// Descendants of a seed list.
#[derive(Debug, Clone)]
pub struct DescendantExtract {
    pub closure: DescendantClosure,
}

impl DescendantExtract {
    pub fn write_ids<W: Write>(&self, writer: W) -> Result<()> {
        write_ids(writer, self.closure.members())
    }
}

/// Machine-readable account of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RefineSummary {
    pub mode: RefineMode,
    pub generation_cap: usize,
    pub xref_rules: usize,
    pub individuals_loaded: usize,
    pub ingest: IngestStats,
    pub seeds: usize,
    pub output_individuals: usize,
    pub truncated: usize,
    pub loop_stems: Vec<String>,
    pub cycles: Vec<CycleReport>,
}

/// A pedigree refinement run: load, check, then extract.
pub struct Refiner {
    config: RefineConfig,
    xref: XrefRules,
    graph: RecordGraph,
    stats: IngestStats,
    sexes: Option<SexMap>,
}

impl Refiner {
    /// # Errors
    /// Returns [`RefineError::Config`] if the configuration is invalid.
    pub fn new(config: RefineConfig) -> Result<Self> {
        config.validate()?;
        let graph = match config.mode {
            RefineMode::Ancestors => RecordGraph::new(),
            RefineMode::Descendants => RecordGraph::with_offspring_index(),
        };
        Ok(Self {
            config,
            xref: XrefRules::new(),
            graph,
            stats: IngestStats::default(),
            sexes: None,
        })
    }

    /// Use `xref` for every pedigree loaded afterwards.
    pub fn set_xref(&mut self, xref: XrefRules) {
        log::info!("using {} xref rules", xref.len());
        self.xref = xref;
    }

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    pub fn graph(&self) -> &RecordGraph {
        &self.graph
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Inferred sexes, available after a successful [`Refiner::check`].
    pub fn sexes(&self) -> Option<&SexMap> {
        self.sexes.as_ref()
    }

    /// Load a pedigree table. May be called more than once; later tables
    /// reconcile against what is already loaded.
    pub fn load_pedigree<R: Read>(&mut self, reader: R, input: &str) -> Result<()> {
        let mut loader =
            PedigreeLoader::new(&self.xref, self.config.input_delimiter).input_name(input);
        let result = loader.load(&mut self.graph, reader);
        self.stats += loader.stats();
        self.sexes = None;
        result
    }

    pub fn load_pedigree_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let reader = open_reader(path)?;
        self.load_pedigree(reader, &path.display().to_string())
    }

    /// Run the structural check and keep the inferred sexes.
    ///
    /// # Errors
    /// Returns [`RefineError::StructuralCollision`] if any ID is used as
    /// both a sire and a dam.
    pub fn check(&mut self) -> Result<&SexMap> {
        log::info!("checking pedigree for errors");
        let sexes = check_structure(&self.graph)?;
        Ok(self.sexes.insert(sexes))
    }

    fn ensure_checked(&mut self) -> Result<()> {
        if self.sexes.is_none() {
            self.check()?;
        }
        Ok(())
    }

    /// Ancestors of `seeds`, ordered parents first.
    ///
    /// Runs the structural check first if it has not run yet.
    pub fn extract_ancestors<'s, I>(&mut self, seeds: I) -> Result<AncestorExtract>
    where
        I: IntoIterator<Item = &'s str>,
    {
        self.ensure_checked()?;
        let closure = AncestorClosure::from_seeds(&self.graph, seeds, self.config.generation_cap);
        log::info!(
            "{} individuals in the result pedigree, sorting",
            closure.len()
        );
        let truncated = closure.truncated_count();
        let loop_stems = closure.loop_stems().to_vec();
        let links = closure.into_links();
        let sequence = sequence(&links);
        Ok(AncestorExtract {
            links,
            sequence,
            loop_stems,
            truncated,
        })
    }

    /// Descendants of `seeds`, seeds included.
    ///
    /// # Errors
    /// Returns [`RefineError::Config`] unless the run was configured with
    /// [`RefineMode::Descendants`].
    pub fn extract_descendants<'s, I>(&mut self, seeds: I) -> Result<DescendantExtract>
    where
        I: IntoIterator<Item = &'s str>,
    {
        if !self.graph.has_offspring_index() {
            return Err(RefineError::Config(
                "descendant extraction needs a run configured for descendants".to_string(),
            ));
        }
        self.ensure_checked()?;
        let closure =
            DescendantClosure::from_seeds(&self.graph, seeds, self.config.generation_cap);
        log::info!("{} individuals in the descendant set", closure.len());
        Ok(DescendantExtract { closure })
    }

    pub fn summarize_ancestors(&self, seeds: usize, extract: &AncestorExtract) -> RefineSummary {
        RefineSummary {
            mode: RefineMode::Ancestors,
            loop_stems: extract.loop_stems.clone(),
            cycles: extract.sequence.cycles.clone(),
            output_individuals: extract.sequence.len(),
            truncated: extract.truncated,
            ..self.base_summary(seeds)
        }
    }

    pub fn summarize_descendants(
        &self,
        seeds: usize,
        extract: &DescendantExtract,
    ) -> RefineSummary {
        RefineSummary {
            mode: RefineMode::Descendants,
            cycles: extract.closure.cycles().to_vec(),
            output_individuals: extract.closure.len(),
            truncated: extract.closure.truncated_count(),
            ..self.base_summary(seeds)
        }
    }

    fn base_summary(&self, seeds: usize) -> RefineSummary {
        RefineSummary {
            mode: self.config.mode,
            generation_cap: self.config.generation_cap.generations(),
            xref_rules: self.xref.len(),
            individuals_loaded: self.graph.len(),
            ingest: self.stats.clone(),
            seeds,
            output_individuals: 0,
            truncated: 0,
            loop_stems: Vec::new(),
            cycles: Vec::new(),
        }
    }
}
