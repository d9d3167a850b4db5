use std::fmt;
use std::io;

/// Errors raised while decoding alignment records or driving a run
#[derive(Debug)]
pub enum MutflowError {
    /// CIGAR string that is not a sequence of `<digits><op>` groups
    MalformedOperationString { cigar: String, reason: String },
    /// MD:Z string with an unexpected character or an empty run
    MalformedEditString { md: String, reason: String },
    /// SAM line with too few columns or a broken annotation column
    MalformedRecord { reason: String },
    /// Any of the above, tagged with the 1-based input line it came from
    AtLine { line: usize, source: Box<MutflowError> },
    Io(io::Error),
    Json(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MutflowError>;

impl MutflowError {
    pub fn at_line(self, line: usize) -> Self {
        MutflowError::AtLine { line, source: Box::new(self) }
    }

    /// True for per-record decode failures, false for I/O and output errors.
    pub fn is_decode_error(&self) -> bool {
        match self {
            MutflowError::MalformedOperationString { .. }
            | MutflowError::MalformedEditString { .. }
            | MutflowError::MalformedRecord { .. } => true,
            MutflowError::AtLine { source, .. } => source.is_decode_error(),
            MutflowError::Io(_) | MutflowError::Json(_) => false,
        }
    }
}

impl fmt::Display for MutflowError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MutflowError::MalformedOperationString { cigar, reason } => {
                write!(f, "malformed CIGAR string '{}': {}", cigar, reason)
            }
            MutflowError::MalformedEditString { md, reason } => {
                write!(f, "malformed MD:Z string '{}': {}", md, reason)
            }
            MutflowError::MalformedRecord { reason } => write!(f, "malformed SAM record: {}", reason),
            MutflowError::AtLine { line, source } => write!(f, "line {}: {}", line, source),
            MutflowError::Io(e) => write!(f, "I/O error: {}", e),
            MutflowError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for MutflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MutflowError::AtLine { source, .. } => Some(source.as_ref()),
            MutflowError::Io(e) => Some(e),
            MutflowError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MutflowError {
    fn from(e: io::Error) -> Self {
        MutflowError::Io(e)
    }
}

impl From<serde_json::Error> for MutflowError {
    fn from(e: serde_json::Error) -> Self {
        MutflowError::Json(e)
    }
}
