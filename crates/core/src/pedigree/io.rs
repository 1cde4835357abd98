use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::{RefineError, Result};
use crate::types::{Identifier, RecordFormat};

use super::graph::RecordGraph;
use super::validate::SexMap;
use super::xref::{XrefRule, XrefRules};

/// Byte value of a field delimiter for the csv reader and writer. Only
/// ASCII delimiters are accepted.
pub(crate) fn delimiter_byte(what: &str, delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        return Err(RefineError::Config(format!(
            "{} delimiter '{}' must be a single ASCII character",
            what, delimiter
        )));
    }
    Ok(delimiter as u8)
}

/// Open a file for buffered reading.
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

impl XrefRules {
    /// Read an xref file from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or any non-comment line
    /// does not have exactly 3 fields.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::from_reader(open_reader(path)?, &path.display().to_string())
    }
}

/// Read seed individuals: whitespace-delimited tokens, in order.
///
/// Unknown-parent tokens (one byte or less) are skipped.
pub fn read_seed_list<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut seeds = Vec::new();
    for line in reader.lines() {
        let line = line?;
        seeds.extend(
            line.split_whitespace()
                .filter_map(|token| match Identifier::parse(token) {
                    Identifier::Known(id) => Some(id),
                    Identifier::Unknown => None,
                }),
        );
    }
    Ok(seeds)
}

/// Write `id,sire,dam` records for `ids`, in the given order.
///
/// # Errors
/// Returns [`RefineError::Config`] if the delimiter is not ASCII.
pub fn write_records<'a, W, I>(
    writer: W,
    graph: &RecordGraph,
    ids: I,
    format: &RecordFormat,
) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a str>,
{
    let delimiter = delimiter_byte("output", format.delimiter)?;
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    for id in ids {
        let link = graph.lookup(id);
        out.write_record([
            id,
            link.sire.render(&format.missing),
            link.dam.render(&format.missing),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Write `id sex` lines (`M`, `F` or `U`) for `ids`.
pub fn write_sex_table<'a, W, I>(mut writer: W, ids: I, sexes: &SexMap) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a str>,
{
    for id in ids {
        writeln!(writer, "{} {}", id, sexes.sex_of(id))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write xref rules in the same format [`XrefRules::from_reader`] reads.
pub fn write_xref_rules<W: Write>(mut writer: W, rules: &[XrefRule]) -> Result<()> {
    for rule in rules {
        writeln!(writer, "{}", rule)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one identifier per line.
pub fn write_ids<'a, W, I>(mut writer: W, ids: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a str>,
{
    for id in ids {
        writeln!(writer, "{}", id)?;
    }
    writer.flush()?;
    Ok(())
}
