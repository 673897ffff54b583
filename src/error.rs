/// Error types shared by the extractor and the aggregator
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RiboError>;

#[derive(Debug, Error)]
pub enum RiboError {
    /// Input file could not be opened
    #[error("Failed to open {}: {}", .path.display(), .message)]
    Open { path: PathBuf, message: String },

    /// Malformed line in a table, vector or track file
    #[error("{}:{}: {}", .path.display(), .line, .message)]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Per-gene inputs that must be aligned by index have different lengths
    #[error("Length mismatch: {what} has {found} entries, expected {expected}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// P-site fell outside its chromosome
    #[error(
        "Offset/geometry mismatch: read {read} on chromosome {chrom} maps its P-site to \
         position {position}, outside [0, {length})"
    )]
    OffsetGeometry {
        read: String,
        chrom: String,
        position: i64,
        length: usize,
    },

    /// Resolved active-site index fell outside the gene's density window
    #[error(
        "Geometry mismatch: gene index {gene} resolves to density index {index}, \
         but its window has {window_len} positions"
    )]
    GeometryMismatch {
        gene: usize,
        index: i64,
        window_len: usize,
    },

    /// Codon at the resolved density index runs past the gene's sequence
    #[error(
        "Geometry mismatch: gene index {gene} reads codon at {index}, \
         but its sequence has {sequence_len} bases"
    )]
    CodonOutOfRange {
        gene: usize,
        index: i64,
        sequence_len: usize,
    },

    /// Annotated span (after the site shift) leaves its chromosome track
    #[error(
        "Geometry mismatch: gene index {gene} window [{start}, {end}) on chromosome {chrom} \
         exceeds track length {length}"
    )]
    WindowOutOfRange {
        gene: usize,
        chrom: String,
        start: i64,
        end: i64,
        length: usize,
    },

    /// Requested reference span lies outside the sequence
    #[error("Span [{start}, {end}) outside chromosome {chrom} of length {length}")]
    SpanOutOfRange {
        chrom: String,
        start: usize,
        end: usize,
        length: usize,
    },

    /// Gene index past the end of the loaded inputs
    #[error("Gene index {gene} is out of range for {genes} genes")]
    GeneOutOfRange { gene: usize, genes: usize },

    #[error("Unknown chromosome: {name}")]
    UnknownChromosome { name: String },

    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RiboError {
    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        RiboError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        RiboError::Open {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
