use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use pedrefiner_core::pedigree::io::{open_reader, read_seed_list, write_xref_rules};
use pedrefiner_core::{
    CyclePolicy, Disposition, RefineConfig, RefineError, RefineMode, RefineSummary, Refiner,
    XrefRule, XrefRules,
};

#[derive(Parser)]
#[command(name = "pedrefiner")]
#[command(version)]
#[command(about = "Extract, check and order sub-pedigrees around a list of individuals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Pedigree table (individual, sire, dam; no header)
    #[arg(short, long)]
    pedigree: PathBuf,

    /// Seed individuals, whitespace-delimited
    #[arg(short, long)]
    seeds: PathBuf,

    /// ID cross-reference rules ("A|S|D FROM TO" per line)
    #[arg(short, long)]
    xref: Option<PathBuf>,

    /// Generations to follow from each seed (0 = unbounded)
    #[arg(short, long, default_value = "0")]
    generations: usize,

    /// Pedigree field delimiter ("tab" and "space" accepted)
    #[arg(short, long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: char,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where suggested xref rules are written when IDs are used as both sire and dam
    #[arg(long, default_value = "xref.CorrectB")]
    correction_file: PathBuf,

    /// Write a JSON run summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the seeds and all their ancestors, parents before offspring
    Ancestors {
        #[command(flatten)]
        common: CommonArgs,

        /// Output field delimiter ("tab" and "space" accepted)
        #[arg(long, default_value = ",", value_parser = parse_delimiter)]
        output_delimiter: char,

        /// Token written for an unknown parent
        #[arg(long, default_value = "0")]
        missing: String,

        /// Inferred sex of each output individual
        #[arg(long, default_value = "pedOut.ID2Gender")]
        sex_table: PathBuf,

        /// On a pedigree loop: "abort", "emit" or "side-file"
        #[arg(long, default_value = "abort")]
        on_cycle: CyclePolicy,

        /// Output written instead of the primary one with --on-cycle side-file
        #[arg(long, default_value = "pedOut.wLoop.csv")]
        cycle_file: PathBuf,
    },

    /// Write the seeds and all their descendants, one ID per line
    Descendants {
        #[command(flatten)]
        common: CommonArgs,
    },
}

fn parse_delimiter(s: &str) -> std::result::Result<char, String> {
    match s {
        "tab" | "\\t" => Ok('\t'),
        "space" => Ok(' '),
        _ => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c),
                _ => Err(format!("'{}' is not a single ASCII character", s)),
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ancestors {
            common,
            output_delimiter,
            missing,
            sex_table,
            on_cycle,
            cycle_file,
        } => {
            let config = RefineConfig::new()
                .mode(RefineMode::Ancestors)
                .generation_cap(common.generations)
                .input_delimiter(common.delimiter)
                .output_delimiter(output_delimiter)
                .missing_out(&missing)
                .cycle_policy(on_cycle);
            cmd_ancestors(&common, config, &sex_table, &cycle_file)
        }
        Commands::Descendants { common } => {
            let config = RefineConfig::new()
                .mode(RefineMode::Descendants)
                .generation_cap(common.generations)
                .input_delimiter(common.delimiter);
            cmd_descendants(&common, config)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::from(exit_status(&err))
        }
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<RefineError>())
        .map(RefineError::exit_code)
        .unwrap_or(1)
}

/// Load xref rules and the pedigree, then run the structural check.
fn prepare(common: &CommonArgs, config: RefineConfig) -> Result<(Refiner, Vec<String>)> {
    let mut refiner = Refiner::new(config).context("Invalid options")?;

    if let Some(xref_path) = &common.xref {
        let xref = XrefRules::from_path(xref_path).with_context(|| {
            format!("Failed to load xref rules from '{}'", xref_path.display())
        })?;
        refiner.set_xref(xref);
    }

    log::info!("reading pedigree from '{}'", common.pedigree.display());
    refiner.load_pedigree_path(&common.pedigree).with_context(|| {
        format!("Failed to load pedigree from '{}'", common.pedigree.display())
    })?;

    if let Err(err) = refiner.check().map(|_| ()) {
        if let RefineError::StructuralCollision { suggestions } = &err {
            write_correction_file(&common.correction_file, suggestions)?;
        }
        return Err(err).context("Pedigree failed the structural check");
    }

    let seeds = open_reader(&common.seeds)
        .and_then(read_seed_list)
        .with_context(|| format!("Failed to read seeds from '{}'", common.seeds.display()))?;
    log::info!("{} seed individuals", seeds.len());

    Ok((refiner, seeds))
}

fn cmd_ancestors(
    common: &CommonArgs,
    config: RefineConfig,
    sex_table: &Path,
    cycle_file: &Path,
) -> Result<()> {
    let format = config.output_format().clone();
    let policy = config.get_cycle_policy();
    let (mut refiner, seeds) = prepare(common, config)?;

    let extract = refiner
        .extract_ancestors(seeds.iter().map(String::as_str))
        .context("Failed to extract ancestors")?;

    if let Some(path) = &common.summary {
        write_summary(path, &refiner.summarize_ancestors(seeds.len(), &extract))?;
    }

    match extract.disposition(policy)? {
        Disposition::Primary => {
            log::info!("writing {} records", extract.sequence.len());
            extract
                .write_records(output_writer(common.output.as_deref())?, &format)
                .context("Failed to write output pedigree")?;

            if let Some(sexes) = refiner.sexes() {
                let file = File::create(sex_table).with_context(|| {
                    format!("Failed to create sex table '{}'", sex_table.display())
                })?;
                extract
                    .write_sex_table(BufWriter::new(file), sexes)
                    .context("Failed to write sex table")?;
            }
            Ok(())
        }
        Disposition::SideFile => {
            log::warn!(
                "pedigree has loops, writing the partial ordering to '{}'",
                cycle_file.display()
            );
            let file = File::create(cycle_file).with_context(|| {
                format!("Failed to create cycle file '{}'", cycle_file.display())
            })?;
            extract
                .write_records(BufWriter::new(file), &format)
                .context("Failed to write cycle file")?;
            Err(extract.cycle_error().into())
        }
    }
}

fn cmd_descendants(common: &CommonArgs, config: RefineConfig) -> Result<()> {
    let (mut refiner, seeds) = prepare(common, config)?;

    let extract = refiner
        .extract_descendants(seeds.iter().map(String::as_str))
        .context("Failed to extract descendants")?;

    if let Some(path) = &common.summary {
        write_summary(path, &refiner.summarize_descendants(seeds.len(), &extract))?;
    }

    log::info!("writing {} IDs", extract.closure.len());
    extract
        .write_ids(output_writer(common.output.as_deref())?)
        .context("Failed to write descendant list")?;
    Ok(())
}

fn output_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output '{}'", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn write_correction_file(path: &Path, suggestions: &[XrefRule]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create correction file '{}'", path.display()))?;
    write_xref_rules(BufWriter::new(file), suggestions)?;
    log::error!(
        "{} suggested xref rule(s) written to '{}'; pass it with --xref on the next run",
        suggestions.len(),
        path.display()
    );
    Ok(())
}

fn write_summary(path: &Path, summary: &RefineSummary) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create summary '{}'", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .context("Failed to write run summary")?;
    Ok(())
}
