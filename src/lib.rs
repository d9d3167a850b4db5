use clap::{ArgAction, Parser};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

pub mod cigar;
pub mod context;
pub mod error;
pub mod flow;
pub mod md;
pub mod reconstruct;
pub mod record;

pub use cigar::{parse_cigar, CigarOp, OpKind};
pub use context::{extract_contexts, ContextCounts, ContextObservation, TripletPair};
pub use error::{MutflowError, Result};
pub use flow::{format_flow, FlowDiagramData};
pub use md::{parse_md, EditKind, MdEdit};
pub use reconstruct::{reconstruct_query, reconstruct_reference};
pub use record::{is_header, SamRecord};

#[derive(Parser, Debug, Clone)]
#[command(name = "mutflow", version, about = "Mismatch trinucleotide context flows from SAM alignments")]
pub struct Args {
    /// Input SAM file ('-' for stdin)
    pub input: String,
    /// Output JSON file ('-' for stdout)
    #[arg(short, long, default_value = "-")]
    pub output: String,
    /// Number of worker threads (0 = one per core)
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,
    /// Lines read and processed per parallel batch
    #[arg(long, default_value_t = BATCH_LINES)]
    pub batch_lines: usize,
    /// Log and skip malformed records instead of aborting
    #[arg(long)]
    pub skip_malformed: bool,
    /// Write single-line JSON
    #[arg(long)]
    pub compact: bool,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// What to do with a line that fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    FailFast,
    SkipMalformed,
}

impl From<&Args> for ErrorPolicy {
    fn from(args: &Args) -> Self {
        if args.skip_malformed {
            ErrorPolicy::SkipMalformed
        } else {
            ErrorPolicy::FailFast
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Alignment lines seen, headers and blank lines excluded
    pub lines: usize,
    pub records: usize,
    pub skipped: usize,
    pub observations: u64,
    pub distinct_pairs: usize,
}

/// Lines handed to the worker pool per batch unless configured otherwise
pub const BATCH_LINES: usize = 100_000;

pub fn open_input(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Per-thread accumulator for the parallel reduction
#[derive(Default)]
struct Partial {
    counts: ContextCounts,
    stats: RunStats,
    /// Earliest failing line and its error
    error: Option<(usize, MutflowError)>,
}

impl Partial {
    fn record_error(&mut self, line: usize, err: MutflowError) {
        let earlier = self.error.as_ref().map_or(true, |(first, _)| line < *first);
        if earlier {
            self.error = Some((line, err));
        }
    }

    fn merge(mut self, other: Partial) -> Partial {
        self.counts = context::merge_counts(self.counts, other.counts);
        self.stats.lines += other.stats.lines;
        self.stats.records += other.stats.records;
        self.stats.skipped += other.stats.skipped;
        self.stats.observations += other.stats.observations;
        if let Some((line, err)) = other.error {
            self.record_error(line, err);
        }
        self
    }

    fn finish(self) -> Result<(ContextCounts, RunStats)> {
        if let Some((_, err)) = self.error {
            return Err(err);
        }
        let mut stats = self.stats;
        stats.distinct_pairs = self.counts.len();
        Ok((self.counts, stats))
    }
}

fn process_line(lineno: usize, line: &str) -> Result<Vec<ContextObservation>> {
    let record = SamRecord::parse(line)?;
    if log::log_enabled!(log::Level::Debug) {
        if let Some((cigar_bases, seq_len)) = record.cigar_seq_mismatch() {
            log::debug!(
                "Line {}: CIGAR consumes {} read bases but SEQ has {}",
                lineno,
                cigar_bases,
                seq_len
            );
        }
    }
    extract_contexts(&record)
}

/// Decode and mine one batch of lines in parallel.
///
/// `first_line` is the 1-based number of `lines[0]`. `first_error` holds
/// the lowest failing line seen so far; under [`ErrorPolicy::FailFast`]
/// lines after it are not decoded.
fn count_batch(lines: &[String], first_line: usize, policy: ErrorPolicy, first_error: &AtomicUsize) -> Partial {
    let fail_fast = policy == ErrorPolicy::FailFast;
    lines
        .par_iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !is_header(line))
        .map(|(i, line)| (first_line + i, line))
        .filter(|(lineno, _)| !fail_fast || *lineno < first_error.load(Ordering::Relaxed))
        .map(|(lineno, line)| {
            let outcome = process_line(lineno, line).map_err(|e| e.at_line(lineno));
            if fail_fast && outcome.is_err() {
                first_error.fetch_min(lineno, Ordering::Relaxed);
            }
            (lineno, outcome)
        })
        .fold(Partial::default, |mut acc, (lineno, outcome)| {
            acc.stats.lines += 1;
            match outcome {
                Ok(observations) => {
                    acc.stats.records += 1;
                    acc.stats.observations += observations.iter().map(|o| o.count).sum::<u64>();
                    context::add_observations(&mut acc.counts, observations);
                }
                Err(e) => match policy {
                    ErrorPolicy::SkipMalformed => {
                        log::warn!("Skipping {}", e);
                        acc.stats.skipped += 1;
                    }
                    ErrorPolicy::FailFast => acc.record_error(lineno, e),
                },
            }
            acc
        })
        .reduce(Partial::default, Partial::merge)
}

/// Count triplet-pair observations over SAM text lines.
///
/// Lines are decoded and mined in parallel and the per-thread tables are
/// summed. Header (`@`) and blank lines are ignored. Under
/// [`ErrorPolicy::FailFast`] the error from the earliest bad line is returned.
pub fn count_contexts(lines: &[String], policy: ErrorPolicy) -> Result<(ContextCounts, RunStats)> {
    count_batch(lines, 1, policy, &AtomicUsize::new(usize::MAX)).finish()
}

/// Streaming form of [`count_contexts`]: reads `batch_lines` lines at a time
/// and stops reading after the first batch that fails under
/// [`ErrorPolicy::FailFast`].
pub fn count_reader<R: BufRead>(
    reader: R,
    policy: ErrorPolicy,
    batch_lines: usize,
) -> Result<(ContextCounts, RunStats)> {
    let batch_lines = batch_lines.max(1);
    let first_error = AtomicUsize::new(usize::MAX);
    let mut total = Partial::default();
    let mut batch = Vec::with_capacity(batch_lines.min(BATCH_LINES));
    let mut first_line = 1;
    let mut lines = reader.lines();

    loop {
        batch.clear();
        for line in lines.by_ref().take(batch_lines) {
            batch.push(line?);
        }
        if batch.is_empty() {
            break;
        }
        log::trace!("Batch of {} lines starting at line {}", batch.len(), first_line);
        total = total.merge(count_batch(&batch, first_line, policy, &first_error));
        if total.error.is_some() {
            break;
        }
        first_line += batch.len();
    }

    total.finish()
}

pub fn write_flow(data: &FlowDiagramData, path: &str, compact: bool) -> Result<()> {
    let writer: Box<dyn Write> = if path == "-" {
        Box::new(io::stdout().lock())
    } else {
        Box::new(File::create(path)?)
    };
    let mut writer = BufWriter::new(writer);
    if compact {
        serde_json::to_writer(&mut writer, data)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, data)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn run_mutflow(args: &Args) -> Result<RunStats> {
    let start = Instant::now();
    let reader = open_input(&args.input)?;
    let (counts, stats) = count_reader(reader, ErrorPolicy::from(args), args.batch_lines)?;
    log::info!("Read {} alignment lines from {}", stats.lines, args.input);
    log::info!(
        "Processed {} records ({} skipped), {} observations over {} triplet pairs",
        stats.records,
        stats.skipped,
        stats.observations,
        stats.distinct_pairs
    );

    let data = format_flow(counts);
    log::debug!("Flow diagram has {} nodes and {} links", data.labels.len(), data.values.len());
    write_flow(&data, &args.output, args.compact)?;
    log::info!("Wrote flow diagram to {} in {:.2?}", args.output, start.elapsed());
    Ok(stats)
}
