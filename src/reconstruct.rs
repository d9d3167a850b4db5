//! Rebuild the reference and the gapped read implied by an alignment.
//!
//! Both reconstructions work on byte slices with plain integer cursors and
//! clamp at the end of their input, so a CIGAR that overruns SEQ yields a
//! shorter string instead of a panic. Cursors saturate rather than wrap.

use crate::cigar::{CigarOp, OpKind, MAX_OP_LEN};
use crate::error::Result;
use crate::md::{parse_md, EditKind, MdEdit};
use crate::record::SamRecord;

/// Placeholder written for alignment columns with no base
pub const GAP: u8 = b'-';

/// Longest deletion gapped into the read; CIGAR run lengths never exceed it
pub const MAX_DELETION_GAP: usize = MAX_OP_LEN;

#[inline]
fn take(seq: &[u8], start: usize, len: usize) -> &[u8] {
    let start = start.min(seq.len());
    let end = start.saturating_add(len).min(seq.len());
    &seq[start..end]
}

/// Gap columns for a run, capped at `limit`
#[inline]
fn gaps(len: usize, limit: usize) -> impl Iterator<Item = u8> {
    std::iter::repeat(GAP).take(len.min(limit))
}

fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Read bases at the positions the CIGAR places on the reference.
///
/// Deletions copy read bases exactly like matches do. Records containing
/// deletions are never used for context extraction, and downstream output
/// depends on this layout, so it is kept as is.
fn raw_reference(query: &[u8], ops: &[CigarOp]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(query.len());
    let mut i = 0;
    for op in ops {
        match op.kind {
            OpKind::Match | OpKind::Deletion => {
                raw.extend_from_slice(take(query, i, op.len));
                i = i.saturating_add(op.len);
            }
            OpKind::Insertion | OpKind::SoftClip => i = i.saturating_add(op.len),
            OpKind::Skip | OpKind::HardClip | OpKind::Padding => {}
        }
    }
    raw
}

/// Replace mismatched bases and splice deleted bases back in from MD:Z
fn overlay_edits(raw: &[u8], edits: &[MdEdit]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    for edit in edits {
        match edit.kind {
            EditKind::Match => {
                out.extend_from_slice(take(raw, i, edit.len));
                i = i.saturating_add(edit.len);
            }
            EditKind::Mismatch => {
                out.extend_from_slice(edit.bases.as_bytes());
                i = i.saturating_add(edit.len);
            }
            // deleted bases were never in the read
            EditKind::Deletion => out.extend_from_slice(edit.bases.as_bytes()),
        }
    }
    out
}

/// Lay the corrected reference back out against the CIGAR, gapping insertions.
///
/// Inserted bases come from the read, so no gap run is longer than `read_len`.
fn expand_gaps(reference: &[u8], ops: &[CigarOp], read_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(reference.len());
    let mut i = 0;
    for op in ops {
        match op.kind {
            OpKind::Match => {
                out.extend_from_slice(take(reference, i, op.len));
                i = i.saturating_add(op.len);
            }
            OpKind::Insertion | OpKind::Padding => out.extend(gaps(op.len, read_len)),
            OpKind::Deletion | OpKind::Skip | OpKind::SoftClip | OpKind::HardClip => {}
        }
    }
    out
}

/// Reconstruct the gap-aligned reference from SEQ, its CIGAR and its MD:Z edits.
///
/// With no edits (or edits that rebuild nothing) the read bases themselves
/// stand in for the reference.
pub fn reconstruct_reference(query: &str, ops: &[CigarOp], edits: &[MdEdit]) -> String {
    let raw = raw_reference(query.as_bytes(), ops);
    let overlaid = overlay_edits(&raw, edits);
    let corrected = if overlaid.is_empty() { raw } else { overlaid };
    into_string(expand_gaps(&corrected, ops, query.len()))
}

/// Reconstruct the read aligned to the reference, with `-` for deleted bases.
///
/// Soft clips and padding move past read bases without emitting them.
pub fn reconstruct_query(query: &str, ops: &[CigarOp]) -> String {
    let query = query.as_bytes();
    let mut out = Vec::with_capacity(query.len());
    let mut i = 0;
    for op in ops {
        match op.kind {
            OpKind::Match | OpKind::Insertion => {
                out.extend_from_slice(take(query, i, op.len));
                i = i.saturating_add(op.len);
            }
            OpKind::Deletion => out.extend(gaps(op.len, MAX_DELETION_GAP)),
            OpKind::SoftClip | OpKind::Padding => i = i.saturating_add(op.len),
            OpKind::Skip | OpKind::HardClip => {}
        }
    }
    into_string(out)
}

/// Reference reconstruction straight from a parsed record.
///
/// A record without a CIGAR yields an empty string; a record without MD:Z
/// falls back to its read bases.
pub fn record_reference(record: &SamRecord) -> Result<String> {
    let ops = match record.cigar_ops()? {
        Some(ops) => ops,
        None => return Ok(String::new()),
    };
    let edits = match record.md() {
        Some(md) => parse_md(md)?,
        None => Vec::new(),
    };
    Ok(reconstruct_reference(&record.seq, &ops, &edits))
}

/// Gapped read straight from a parsed record; empty without a CIGAR
pub fn record_query(record: &SamRecord) -> Result<String> {
    Ok(match record.cigar_ops()? {
        Some(ops) => reconstruct_query(&record.seq, &ops),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar::parse_cigar;

    fn reference(cigar: &str, seq: &str, md: &str) -> String {
        reconstruct_reference(seq, &parse_cigar(cigar).unwrap(), &parse_md(md).unwrap())
    }

    fn query(cigar: &str, seq: &str) -> String {
        reconstruct_query(seq, &parse_cigar(cigar).unwrap())
    }

    #[test]
    fn test_single_mismatch() {
        assert_eq!(reference("5M", "ACGTA", "2A2"), "ACATA");
        assert_eq!(query("5M", "ACGTA"), "ACGTA");
    }

    #[test]
    fn test_no_edits_uses_read() {
        assert_eq!(reference("5M", "ACGTA", ""), "ACGTA");
        assert_eq!(reference("5M", "ACGTA", "0"), "ACGTA");
    }

    #[test]
    fn test_insertion_gapped_in_reference() {
        assert_eq!(reference("2M1I2M", "ACTGT", "4"), "AC-GT");
        assert_eq!(query("2M1I2M", "ACTGT"), "ACTGT");
    }

    #[test]
    fn test_deletion_copies_read_bases() {
        // deletions are laid out like matches in the first pass
        assert_eq!(reference("2M1D2M", "ACGT", "2^T2"), "ACTG");
        assert_eq!(query("2M1D2M", "ACGT"), "AC-GT");
    }

    #[test]
    fn test_soft_clip_skips_read_bases() {
        assert_eq!(reference("2S3M", "TTACG", "1G1"), "AGG");
        assert_eq!(query("2S3M", "TTACG"), "ACG");
        assert_eq!(query("3M2S", "ACGTT"), "ACG");
    }

    #[test]
    fn test_hard_clip_and_skip_consume_nothing() {
        assert_eq!(reference("3H4M", "ACGT", "4"), "ACGT");
        assert_eq!(query("3H4M", "ACGT"), "ACGT");
        assert_eq!(reference("2M100N2M", "ACGT", "1T2"), "ATGT");
        assert_eq!(query("2M100N2M", "ACGT"), "ACGT");
    }

    #[test]
    fn test_padding_gapped_in_reference() {
        assert_eq!(reference("2M2P2M", "ACGT", "4"), "AC--GT");
    }

    #[test]
    fn test_padding_skips_read_bases() {
        assert_eq!(query("2M2P2M", "ACGTTT"), "ACTT");
    }

    #[test]
    fn test_huge_md_runs_saturate() {
        let ops = parse_cigar("5M").unwrap();
        let edits = parse_md("18446744073709551615A1").unwrap();
        assert_eq!(reconstruct_reference("ACGTA", &ops, &edits), "ACGTA");
    }

    #[test]
    fn test_gap_runs_capped_by_read_length() {
        let ops = vec![
            CigarOp::new(OpKind::Match, 2),
            CigarOp::new(OpKind::Insertion, usize::MAX),
            CigarOp::new(OpKind::Padding, usize::MAX),
            CigarOp::new(OpKind::SoftClip, usize::MAX),
            CigarOp::new(OpKind::Match, 2),
        ];
        assert_eq!(reconstruct_reference("ACGT", &ops, &[]), "AC--------");
        assert_eq!(reconstruct_query("ACGT", &ops), "ACGT");
    }

    #[test]
    fn test_short_read_clamps() {
        assert_eq!(reference("10M", "ACG", "10"), "ACG");
        assert_eq!(query("10M", "ACG"), "ACG");
    }

    #[test]
    fn test_equal_length_without_indels() {
        let cases = [
            ("8M", "ACGTACGT", "3C4"),
            ("2S6M", "TTACGTAC", "0G5"),
            ("3M50N5M", "ACGTACGT", "7A"),
            ("4=1X3=", "ACGTTCGT", "4A3"),
            ("1H8M2H", "GGGGCCCC", "8"),
        ];
        for (cigar, seq, md) in cases {
            assert_eq!(
                reference(cigar, seq, md).len(),
                query(cigar, seq).len(),
                "length mismatch for {} {}",
                cigar,
                md
            );
        }
    }

    #[test]
    fn test_record_helpers() {
        let rec = SamRecord::parse("r\t0\tc\t1\t60\t5M\t*\t0\t0\tACGTA\tIIIII\tMD:Z:2A2").unwrap();
        assert_eq!(record_reference(&rec).unwrap(), "ACATA");
        assert_eq!(record_query(&rec).unwrap(), "ACGTA");

        let unmapped = SamRecord::parse("r\t4\t*\t0\t0\t*\t*\t0\t0\tACGTA\tIIIII").unwrap();
        assert_eq!(record_reference(&unmapped).unwrap(), "");
        assert_eq!(record_query(&unmapped).unwrap(), "");
    }

    #[test]
    fn test_record_with_bad_md() {
        let rec = SamRecord::parse("r\t0\tc\t1\t60\t5M\t*\t0\t0\tACGTA\tIIIII\tMD:Z:2A#").unwrap();
        assert!(record_reference(&rec).is_err());
    }
}
