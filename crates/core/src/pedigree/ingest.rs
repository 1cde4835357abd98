use std::io::Read;

use serde::Serialize;

use crate::error::{RefineError, Result};
use crate::types::{Identifier, ParentLink, RecordFormat, UNKNOWN_TOKEN};

use super::graph::RecordGraph;
use super::io::delimiter_byte;
use super::xref::XrefRules;

/// What happened to a single pedigree line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New individual stored.
    Stored,
    /// Same individual with identical parents already stored; kept as is.
    Duplicate,
    /// Same individual with different parents; the new line replaced it.
    Replaced { previous: ParentLink },
    /// Individual column was an unknown token; nothing stored.
    Discarded,
}

/// Counters collected while loading a pedigree table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub lines: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub replaced: usize,
    pub self_references: usize,
    pub discarded: usize,
}

impl std::ops::AddAssign<&IngestStats> for IngestStats {
    fn add_assign(&mut self, other: &IngestStats) {
        self.lines += other.lines;
        self.stored += other.stored;
        self.duplicates += other.duplicates;
        self.replaced += other.replaced;
        self.self_references += other.self_references;
        self.discarded += other.discarded;
    }
}

/// Reads `individual,sire,dam` lines into a [`RecordGraph`], applying ID
/// cross-references and reconciling repeated entries.
///
/// Repeated entries follow a last-wins policy: an identical repeat is a
/// logged no-op, any other repeat overwrites the stored link and logs both
/// versions.
pub struct PedigreeLoader<'x> {
    xref: &'x XrefRules,
    delimiter: char,
    input: String,
    stats: IngestStats,
}

impl<'x> PedigreeLoader<'x> {
    pub fn new(xref: &'x XrefRules, delimiter: char) -> Self {
        Self {
            xref,
            delimiter,
            input: "pedigree".to_string(),
            stats: IngestStats::default(),
        }
    }

    /// Name used for this input in parse errors.
    pub fn input_name(mut self, name: &str) -> Self {
        self.input = name.to_string();
        self
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn into_stats(self) -> IngestStats {
        self.stats
    }

    /// Ingest one raw line. `line_no` is only used for error reporting.
    ///
    /// An empty line is skipped the same way [`PedigreeLoader::load`] skips
    /// it: the outcome is [`IngestOutcome::Discarded`] and no counter moves.
    ///
    /// # Errors
    /// Returns [`RefineError::Parse`] if the line does not split into
    /// exactly 3 fields.
    pub fn ingest_line(
        &mut self,
        graph: &mut RecordGraph,
        line: &str,
        line_no: usize,
    ) -> Result<IngestOutcome> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.is_empty() {
            return Ok(IngestOutcome::Discarded);
        }
        let fields: Vec<&str> = line.split(self.delimiter).collect();
        self.ingest_fields(graph, &fields, line_no)
    }

    /// Ingest an already split line.
    pub fn ingest_fields(
        &mut self,
        graph: &mut RecordGraph,
        fields: &[&str],
        line_no: usize,
    ) -> Result<IngestOutcome> {
        self.stats.lines += 1;
        if fields.len() != 3 {
            return Err(RefineError::Parse {
                input: self.input.clone(),
                line: line_no,
                found: fields.len(),
                content: fields.join(self.delimiter.to_string().as_str()),
            });
        }

        let [id, sire, dam] = self.xref.apply(
            Identifier::parse(fields[0]),
            Identifier::parse(fields[1]),
            Identifier::parse(fields[2]),
        );
        let Identifier::Known(id) = id else {
            self.stats.discarded += 1;
            return Ok(IngestOutcome::Discarded);
        };

        let mut link = ParentLink::new(sire, dam);
        if link.has_parent(&id) {
            log::warn!("ID {} is same for its parent(s), replaced with unknown", id);
            if link.sire.is(&id) {
                link.sire = Identifier::Unknown;
            }
            if link.dam.is(&id) {
                link.dam = Identifier::Unknown;
            }
            self.stats.self_references += 1;
        }

        let outcome = match graph.get(&id).cloned() {
            None => {
                graph.upsert(&id, link);
                self.stats.stored += 1;
                IngestOutcome::Stored
            }
            Some(existing) if existing == link => {
                log::info!("duplicated (but same) entry for {}", id);
                self.stats.duplicates += 1;
                IngestOutcome::Duplicate
            }
            Some(existing) => {
                let format = RecordFormat::new(self.delimiter, UNKNOWN_TOKEN);
                log::warn!(
                    "duplicated (yet different) entry for {}, using the latest version",
                    id
                );
                log::warn!("    version1: {}", format.render(&id, &existing));
                log::warn!("    version2: {}", format.render(&id, &link));
                graph.upsert(&id, link);
                self.stats.replaced += 1;
                IngestOutcome::Replaced { previous: existing }
            }
        };
        Ok(outcome)
    }

    /// Ingest every line of a headerless delimited table.
    ///
    /// Blank lines are skipped. Loading stops at the first malformed line.
    ///
    /// # Errors
    /// Returns [`RefineError::Parse`] on a line without exactly 3 fields, or
    /// an IO/CSV error if the reader fails.
    pub fn load<R: Read>(&mut self, graph: &mut RecordGraph, reader: R) -> Result<()> {
        let delimiter = delimiter_byte("pedigree", self.delimiter)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .delimiter(delimiter)
            .from_reader(reader);

        let mut record = csv::StringRecord::new();
        while reader.read_record(&mut record)? {
            let line_no = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(self.stats.lines + 1);
            let fields: Vec<&str> = record.iter().collect();
            self.ingest_fields(graph, &fields, line_no)?;
        }
        log::info!(
            "loaded {} individuals from {} lines of {} ({} duplicates, {} replaced, {} self-references)",
            graph.len(),
            self.stats.lines,
            self.input,
            self.stats.duplicates,
            self.stats.replaced,
            self.stats.self_references
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedigree::XrefRules;

    fn load(text: &str) -> (RecordGraph, IngestStats) {
        let xref = XrefRules::new();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, ',');
        loader.load(&mut graph, text.as_bytes()).unwrap();
        (graph, loader.into_stats())
    }

    #[test]
    fn test_basic_load() {
        let (graph, stats) = load("C1,S1,D1\nS1,0,0\n");
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.record_text("C1"), "C1,S1,D1");
        assert_eq!(stats.stored, 2);
        assert_eq!(stats.lines, 2);
    }

    #[test]
    fn test_short_fields_are_unknown() {
        let (graph, _) = load("C1,.,\nC2,X,NA\n");
        assert_eq!(graph.record_text("C1"), "C1,0,0");
        assert_eq!(graph.record_text("C2"), "C2,0,NA");
    }

    #[test]
    fn test_wrong_field_count_is_fatal() {
        let xref = XrefRules::new();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, ',').input_name("ped.csv");
        let err = loader
            .load(&mut graph, "C1,S1,D1\nC2,S1\n".as_bytes())
            .unwrap_err();
        match err {
            RefineError::Parse {
                input, line, found, ..
            } => {
                assert_eq!(input, "ped.csv");
                assert_eq!(line, 2);
                assert_eq!(found, 2);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_too_many_fields_is_fatal() {
        let xref = XrefRules::new();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, ',');
        let result = loader.ingest_line(&mut graph, "C1,S1,D1,extra", 7);
        assert!(matches!(result, Err(RefineError::Parse { found: 4, line: 7, .. })));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_unknown_subject_is_discarded() {
        let (graph, stats) = load("0,S1,D1\n.,S2,D2\n");
        assert!(graph.is_empty());
        assert_eq!(stats.discarded, 2);
    }

    #[test]
    fn test_self_reference_rewritten() {
        let (graph, stats) = load("C1,C1,D1\nC2,S2,C2\n");
        assert_eq!(graph.record_text("C1"), "C1,0,D1");
        assert_eq!(graph.record_text("C2"), "C2,S2,0");
        assert_eq!(stats.self_references, 2);
    }

    #[test]
    fn test_identical_repeat_is_idempotent() {
        let (once, _) = load("C1,S1,D1\n");
        let (twice, stats) = load("C1,S1,D1\nC1,S1,D1\n");
        assert_eq!(once.record_text("C1"), twice.record_text("C1"));
        assert_eq!(twice.len(), 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.replaced, 0);
    }

    #[test]
    fn test_conflicting_repeat_last_wins() {
        let xref = XrefRules::new();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, ',');
        loader.ingest_line(&mut graph, "C1,S1,D1", 1).unwrap();
        let outcome = loader.ingest_line(&mut graph, "C1,S9,0", 2).unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Replaced {
                previous: ParentLink::new("S1".into(), "D1".into())
            }
        );
        // Newer line wins even though it knows less.
        assert_eq!(graph.record_text("C1"), "C1,S9,0");
        assert_eq!(loader.stats().replaced, 1);
    }

    #[test]
    fn test_xref_applied_before_storing() {
        let xref = XrefRules::from_reader("A OLD1 NEW1\n".as_bytes(), "xref").unwrap();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, ',');
        loader
            .load(&mut graph, "C1,OLD1,D1\nOLD1,0,0\n".as_bytes())
            .unwrap();
        assert_eq!(graph.record_text("C1"), "C1,NEW1,D1");
        assert!(graph.contains("NEW1"));
        assert!(!graph.contains("OLD1"));
    }

    #[test]
    fn test_xref_resolves_conflict_into_duplicate() {
        let xref = XrefRules::from_reader("S SX1 S1\n".as_bytes(), "xref").unwrap();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, ',');
        loader
            .load(&mut graph, "C1,S1,D1\nC1,SX1,D1\n".as_bytes())
            .unwrap();
        assert_eq!(loader.stats().duplicates, 1);
        assert_eq!(loader.stats().replaced, 0);
    }

    #[test]
    fn test_xref_can_create_self_reference() {
        let xref = XrefRules::from_reader("A ALIAS C1\n".as_bytes(), "xref").unwrap();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, ',');
        loader.ingest_line(&mut graph, "C1,ALIAS,D1", 1).unwrap();
        assert_eq!(graph.record_text("C1"), "C1,0,D1");
    }

    #[test]
    fn test_offspring_index_built_during_load() {
        let xref = XrefRules::new();
        let mut graph = RecordGraph::with_offspring_index();
        let mut loader = PedigreeLoader::new(&xref, ',');
        loader
            .load(&mut graph, "C1,S1,D1\nC2,S1,0\nC3,C3,D1\n".as_bytes())
            .unwrap();
        assert_eq!(graph.offspring_of("S1").unwrap().len(), 2);
        assert_eq!(graph.offspring_of("D1").unwrap().len(), 2);
        assert!(graph.offspring_of("C3").is_none());
    }

    #[test]
    fn test_tab_delimiter_and_blank_lines() {
        let xref = XrefRules::new();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, '\t');
        loader
            .load(&mut graph, "C1\tS1\tD1\n\nS1\t0\t0\r\n".as_bytes())
            .unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.record_text("S1"), "S1,0,0");
    }

    #[test]
    fn test_blank_line_skipped_like_load() {
        let xref = XrefRules::new();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, ',');
        assert_eq!(
            loader.ingest_line(&mut graph, "", 1).unwrap(),
            IngestOutcome::Discarded
        );
        assert_eq!(
            loader.ingest_line(&mut graph, "\r\n", 2).unwrap(),
            IngestOutcome::Discarded
        );
        assert!(graph.is_empty());
        assert_eq!(loader.stats(), &IngestStats::default());

        let mut loaded = RecordGraph::new();
        let mut other = PedigreeLoader::new(&xref, ',');
        other.load(&mut loaded, "\n\n".as_bytes()).unwrap();
        assert_eq!(other.stats(), loader.stats());
    }

    #[test]
    fn test_multibyte_delimiter_rejected() {
        let xref = XrefRules::new();
        let mut graph = RecordGraph::new();
        let mut loader = PedigreeLoader::new(&xref, '§');
        let result = loader.load(&mut graph, "a§b§c\n".as_bytes());
        assert!(matches!(result, Err(RefineError::Config(_))));
        assert!(graph.is_empty());
    }
}
