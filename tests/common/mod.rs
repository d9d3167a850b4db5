#![allow(dead_code)]

use mutflow::Args;

pub const SAM_HEADER: &str = "@HD\tVN:1.6\tSO:unsorted\n@SQ\tSN:chr1\tLN:1000\n";

/// Create default Args for testing
pub fn default_test_args(input: String, output: String) -> Args {
    Args {
        input,
        output,
        threads: 1,
        batch_lines: 4,
        skip_malformed: false,
        compact: false,
        verbose: 0,
    }
}

/// A mapped SAM line on chr1 with an optional MD:Z tag
pub fn sam_line(name: &str, cigar: &str, seq: &str, md: Option<&str>) -> String {
    let qual = "I".repeat(seq.len());
    let mut line = format!("{}\t0\tchr1\t100\t60\t{}\t*\t0\t0\t{}\t{}\tNM:i:1", name, cigar, seq, qual);
    if let Some(md) = md {
        line.push_str("\tMD:Z:");
        line.push_str(md);
    }
    line
}
