/// Reference sequence access
use crate::error::{Result, RiboError};
use indexmap::IndexMap;
use rust_htslib::faidx;
use std::collections::HashMap;
use std::path::Path;

/// Anything that can hand out a stretch of reference sequence
pub trait SequenceSource {
    /// Bases `[start, end)` of `chrom`, 0-based
    fn fetch(&self, chrom: &str, start: usize, end: usize) -> Result<Vec<u8>>;
}

/// Indexed FASTA read through htslib (the `.fai` is built on first open)
pub struct ReferenceGenome {
    reader: faidx::Reader,
    lengths: HashMap<String, usize>,
}

impl ReferenceGenome {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = faidx::Reader::from_path(path).map_err(|e| RiboError::open(path, e))?;
        let lengths = reader
            .seq_names()
            .map_err(|e| RiboError::open(path, e))?
            .into_iter()
            .map(|name| {
                let len = reader.fetch_seq_len(&name) as usize;
                (name, len)
            })
            .collect();
        Ok(Self { reader, lengths })
    }

    pub fn length(&self, chrom: &str) -> Option<usize> {
        self.lengths.get(chrom).copied()
    }
}

impl SequenceSource for ReferenceGenome {
    fn fetch(&self, chrom: &str, start: usize, end: usize) -> Result<Vec<u8>> {
        let len = self.length(chrom).ok_or_else(|| RiboError::UnknownChromosome {
            name: chrom.to_string(),
        })?;
        check_span(chrom, start, end, len)?;
        if start == end {
            return Ok(Vec::new());
        }
        // faidx takes an inclusive end
        let seq = self.reader.fetch_seq_string(chrom, start, end - 1)?;
        Ok(seq.into_bytes())
    }
}

/// In-memory sequences, e.g. a single chromosome string
impl SequenceSource for IndexMap<String, Vec<u8>> {
    fn fetch(&self, chrom: &str, start: usize, end: usize) -> Result<Vec<u8>> {
        let seq = self.get(chrom).ok_or_else(|| RiboError::UnknownChromosome {
            name: chrom.to_string(),
        })?;
        check_span(chrom, start, end, seq.len())?;
        Ok(seq[start..end].to_vec())
    }
}

fn check_span(chrom: &str, start: usize, end: usize, len: usize) -> Result<()> {
    if start > end || end > len {
        return Err(RiboError::SpanOutOfRange {
            chrom: chrom.to_string(),
            start,
            end,
            length: len,
        });
    }
    Ok(())
}
