//! SAM text records

use std::collections::HashMap;
use std::str::FromStr;

use crate::cigar::{parse_cigar, query_length, CigarOp};
use crate::error::{MutflowError, Result};

/// Number of mandatory SAM columns
pub const SAM_FIELDS: usize = 11;

/// Annotation key carrying the edit list
pub const MD_TAG: &str = "MD:Z";

/// One alignment line. Fields are kept as text; cross-field consistency is
/// left to the reconstruction code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SamRecord {
    pub qname: String,
    pub flag: String,
    pub rname: String,
    pub pos: String,
    pub mapq: String,
    pub cigar: String,
    pub rnext: String,
    pub pnext: String,
    pub tlen: String,
    pub seq: String,
    pub qual: String,
    /// Optional columns keyed by `TAG:TYPE`
    pub tags: HashMap<String, String>,
}

/// Header lines start with `@` and carry no alignment
#[inline]
pub fn is_header(line: &str) -> bool {
    line.starts_with('@')
}

impl SamRecord {
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() < SAM_FIELDS {
            return Err(MutflowError::MalformedRecord {
                reason: format!("expected at least {} columns, found {}", SAM_FIELDS, fields.len()),
            });
        }

        let mut tags = HashMap::new();
        for column in &fields[SAM_FIELDS..] {
            let mut parts = column.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(tag), Some(ty), Some(value)) => {
                    tags.insert(format!("{}:{}", tag, ty), value.to_string());
                }
                _ => {
                    return Err(MutflowError::MalformedRecord {
                        reason: format!("annotation '{}' is not TAG:TYPE:VALUE", column),
                    })
                }
            }
        }

        Ok(SamRecord {
            qname: fields[0].to_string(),
            flag: fields[1].to_string(),
            rname: fields[2].to_string(),
            pos: fields[3].to_string(),
            mapq: fields[4].to_string(),
            cigar: fields[5].to_string(),
            rnext: fields[6].to_string(),
            pnext: fields[7].to_string(),
            tlen: fields[8].to_string(),
            seq: fields[9].to_string(),
            qual: fields[10].to_string(),
            tags,
        })
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// The MD:Z edit string, if the aligner wrote one
    pub fn md(&self) -> Option<&str> {
        self.tag(MD_TAG)
    }

    /// Decoded CIGAR, or `None` when the column is `*` (unavailable)
    pub fn cigar_ops(&self) -> Result<Option<Vec<CigarOp>>> {
        if self.cigar == "*" {
            return Ok(None);
        }
        parse_cigar(&self.cigar).map(Some)
    }

    /// `(cigar_bases, seq_len)` when the CIGAR's query-consuming runs do
    /// not add up to the length of SEQ. Records without SEQ or with an
    /// undecodable CIGAR report nothing.
    pub fn cigar_seq_mismatch(&self) -> Option<(usize, usize)> {
        if self.seq == "*" {
            return None;
        }
        let ops = self.cigar_ops().ok()??;
        let expected = query_length(&ops);
        (expected != self.seq.len()).then_some((expected, self.seq.len()))
    }
}

impl FromStr for SamRecord {
    type Err = MutflowError;

    fn from_str(s: &str) -> Result<Self> {
        SamRecord::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar::OpKind;

    const LINE: &str = "read1\t0\tchr1\t100\t60\t5M\t*\t0\t0\tACGTA\tIIIII\tNM:i:1\tMD:Z:2A2";

    #[test]
    fn test_parse_fields_and_tags() {
        let rec = SamRecord::parse(LINE).unwrap();
        assert_eq!(rec.qname, "read1");
        assert_eq!(rec.rname, "chr1");
        assert_eq!(rec.pos, "100");
        assert_eq!(rec.cigar, "5M");
        assert_eq!(rec.seq, "ACGTA");
        assert_eq!(rec.qual, "IIIII");
        assert_eq!(rec.tags.len(), 2);
        assert_eq!(rec.tag("NM:i"), Some("1"));
        assert_eq!(rec.md(), Some("2A2"));
    }

    #[test]
    fn test_no_annotations() {
        let rec: SamRecord = "r\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\t*".parse().unwrap();
        assert!(rec.tags.is_empty());
        assert_eq!(rec.md(), None);
        assert_eq!(rec.cigar_ops().unwrap(), None);
    }

    #[test]
    fn test_trailing_newline_trimmed() {
        let rec = SamRecord::parse(&format!("{}\r\n", LINE)).unwrap();
        assert_eq!(rec.md(), Some("2A2"));
    }

    #[test]
    fn test_tag_value_keeps_colons() {
        let rec = SamRecord::parse("r\t0\tc\t1\t60\t2M\t*\t0\t0\tAC\tII\tXA:Z:chr2:+100:2M:0").unwrap();
        assert_eq!(rec.tag("XA:Z"), Some("chr2:+100:2M:0"));
    }

    #[test]
    fn test_too_few_fields() {
        let err = SamRecord::parse("r\t0\tchr1\t100\t60\t5M").unwrap_err();
        assert!(matches!(err, MutflowError::MalformedRecord { .. }));
    }

    #[test]
    fn test_bad_annotation() {
        let err = SamRecord::parse("r\t0\tc\t1\t60\t2M\t*\t0\t0\tAC\tII\tNM").unwrap_err();
        assert!(matches!(err, MutflowError::MalformedRecord { .. }));
    }

    #[test]
    fn test_cigar_ops() {
        let rec = SamRecord::parse(LINE).unwrap();
        let ops = rec.cigar_ops().unwrap().unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OpKind::Match);
        assert_eq!(ops[0].len, 5);
    }

    #[test]
    fn test_cigar_seq_mismatch() {
        assert_eq!(SamRecord::parse(LINE).unwrap().cigar_seq_mismatch(), None);

        let short = SamRecord::parse("r\t0\tc\t1\t60\t2S6M\t*\t0\t0\tACGTA\t*").unwrap();
        assert_eq!(short.cigar_seq_mismatch(), Some((8, 5)));

        let no_seq = SamRecord::parse("r\t0\tc\t1\t60\t6M\t*\t0\t0\t*\t*").unwrap();
        assert_eq!(no_seq.cigar_seq_mismatch(), None);
        let bad_cigar = SamRecord::parse("r\t0\tc\t1\t60\t6Q\t*\t0\t0\tACGTA\t*").unwrap();
        assert_eq!(bad_cigar.cigar_seq_mismatch(), None);
    }

    #[test]
    fn test_header_lines() {
        assert!(is_header("@HD\tVN:1.6"));
        assert!(is_header("@SQ\tSN:chr1\tLN:1000"));
        assert!(!is_header(LINE));
    }
}
