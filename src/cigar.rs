//! CIGAR decoding into run-length alignment operations

use crate::error::{MutflowError, Result};

/// Longest run a CIGAR operation can carry (BAM packs lengths into 28 bits)
pub const MAX_OP_LEN: usize = (1 << 28) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `M`, `=` and `X` all collapse here; mismatches come from MD:Z
    Match,
    Insertion,
    Deletion,
    /// `N`, e.g. a splice junction
    Skip,
    SoftClip,
    HardClip,
    Padding,
}

impl OpKind {
    pub fn from_char(ch: char) -> Option<OpKind> {
        match ch {
            'M' | '=' | 'X' => Some(OpKind::Match),
            'I' => Some(OpKind::Insertion),
            'D' => Some(OpKind::Deletion),
            'N' => Some(OpKind::Skip),
            'S' => Some(OpKind::SoftClip),
            'H' => Some(OpKind::HardClip),
            'P' => Some(OpKind::Padding),
            _ => None,
        }
    }

    /// Whether the operation spans bases present in the SEQ column
    #[inline]
    pub fn consumes_query(self) -> bool {
        matches!(self, OpKind::Match | OpKind::Insertion | OpKind::SoftClip)
    }

    #[inline]
    pub fn is_indel(self) -> bool {
        matches!(self, OpKind::Insertion | OpKind::Deletion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: OpKind,
    pub len: usize,
}

impl CigarOp {
    pub fn new(kind: OpKind, len: usize) -> Self {
        Self { kind, len }
    }
}

fn malformed(cigar: &str, reason: String) -> MutflowError {
    MutflowError::MalformedOperationString { cigar: cigar.to_string(), reason }
}

/// Parse a CIGAR string such as `10M2I5M` into its operations.
///
/// Every operation needs an explicit run length between one and
/// [`MAX_OP_LEN`].
pub fn parse_cigar(cigar: &str) -> Result<Vec<CigarOp>> {
    let mut ops = Vec::new();
    let mut count: usize = 0;
    let mut digits = 0;

    for ch in cigar.chars() {
        if let Some(d) = ch.to_digit(10) {
            count = count
                .checked_mul(10)
                .and_then(|c| c.checked_add(d as usize))
                .filter(|c| *c <= MAX_OP_LEN)
                .ok_or_else(|| malformed(cigar, format!("run length exceeds {}", MAX_OP_LEN)))?;
            digits += 1;
            continue;
        }

        let kind = OpKind::from_char(ch)
            .ok_or_else(|| malformed(cigar, format!("unknown operation '{}'", ch)))?;
        if digits == 0 {
            return Err(malformed(cigar, format!("operation '{}' has no run length", ch)));
        }
        if count == 0 {
            return Err(malformed(cigar, format!("operation '{}' has a zero run length", ch)));
        }
        ops.push(CigarOp::new(kind, count));
        count = 0;
        digits = 0;
    }

    if digits > 0 {
        return Err(malformed(cigar, "trailing run length without an operation".to_string()));
    }

    Ok(ops)
}

/// True if any operation is an insertion or a deletion
pub fn has_indel(ops: &[CigarOp]) -> bool {
    ops.iter().any(|op| op.kind.is_indel())
}

/// Number of SEQ bases the operations account for
pub fn query_length(ops: &[CigarOp]) -> usize {
    ops.iter()
        .filter(|op| op.kind.consumes_query())
        .fold(0usize, |total, op| total.saturating_add(op.len))
}
