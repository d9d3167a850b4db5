//! Trinucleotide context around mismatches

use std::collections::HashMap;

use serde::Serialize;

use crate::cigar::has_indel;
use crate::error::Result;
use crate::md::{parse_md, EditKind};
use crate::reconstruct::{reconstruct_query, reconstruct_reference};
use crate::record::SamRecord;

pub const WINDOW: usize = 3;

/// Reference triplet and the read triplet aligned against it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TripletPair {
    pub reference: String,
    pub query: String,
}

impl TripletPair {
    pub fn new(reference: impl Into<String>, query: impl Into<String>) -> Self {
        Self { reference: reference.into(), query: query.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextObservation {
    pub pair: TripletPair,
    pub count: u64,
}

/// Summed observation counts keyed by triplet pair
pub type ContextCounts = HashMap<TripletPair, u64>;

fn window(seq: &[u8], start: usize) -> String {
    let end = start.saturating_add(WINDOW).min(seq.len());
    String::from_utf8_lossy(&seq[start.min(end)..end]).into_owned()
}

/// Collect reference/read triplets around each mismatch run of a record.
///
/// Only records with an MD:Z tag and a CIGAR free of insertions and
/// deletions take part; anything else contributes no observations. Each
/// mismatch run yields up to three windows, all containing the first base
/// of the run.
pub fn extract_contexts(record: &SamRecord) -> Result<Vec<ContextObservation>> {
    let ops = match record.cigar_ops()? {
        Some(ops) if !has_indel(&ops) => ops,
        _ => return Ok(Vec::new()),
    };
    let md = match record.md() {
        Some(md) => md,
        None => return Ok(Vec::new()),
    };

    let edits = parse_md(md)?;
    let reference = reconstruct_reference(&record.seq, &ops, &edits);
    let query = reconstruct_query(&record.seq, &ops);
    let (reference, query) = (reference.as_bytes(), query.as_bytes());

    let mut observations = Vec::new();
    let mut cursor = 0usize;
    for edit in &edits {
        if edit.kind == EditKind::Mismatch {
            for back in (0..WINDOW).rev() {
                let Some(start) = cursor.checked_sub(back) else { continue };
                if start.saturating_add(WINDOW) > reference.len() {
                    continue;
                }
                observations.push(ContextObservation {
                    pair: TripletPair::new(window(reference, start), window(query, start)),
                    count: 1,
                });
            }
        }
        cursor = cursor.saturating_add(edit.len);
    }

    Ok(observations)
}

/// Fold observations into a count table
pub fn add_observations<I>(counts: &mut ContextCounts, observations: I)
where
    I: IntoIterator<Item = ContextObservation>,
{
    for obs in observations {
        *counts.entry(obs.pair).or_insert(0) += obs.count;
    }
}

/// Merge two partial count tables; order does not affect the result
pub fn merge_counts(mut a: ContextCounts, b: ContextCounts) -> ContextCounts {
    if a.len() < b.len() {
        return merge_counts(b, a);
    }
    for (pair, count) in b {
        *a.entry(pair).or_insert(0) += count;
    }
    a
}
