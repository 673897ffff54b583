/// Alignment records and the htslib-backed alignment source
use crate::chrom::{ChromosomeTable, NameRules};
use crate::error::{Result, RiboError};
use log::debug;
use rust_htslib::bam::{self, ext::BamRecordExtensions, Read};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn symbol(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Strand {
    type Err = String;

    /// Accepts "+"/"-" as well as the numeric 1/-1 used by exported GFF tables
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "+" | "1" | "1.0" => Ok(Strand::Forward),
            "-" | "-1" | "-1.0" => Ok(Strand::Reverse),
            other => Err(format!("Invalid strand '{other}'")),
        }
    }
}

/// One read as seen by the extractor. Coordinates are 0-based, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub name: String,
    /// Reference name exactly as it appears in the source header
    pub reference: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub mapped: bool,
}

impl AlignmentRecord {
    pub fn mapped(
        name: impl Into<String>,
        reference: impl Into<String>,
        start: i64,
        end: i64,
        strand: Strand,
    ) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            start,
            end,
            strand,
            mapped: true,
        }
    }

    pub fn unmapped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: String::new(),
            start: -1,
            end: -1,
            strand: Strand::Forward,
            mapped: false,
        }
    }
}

/// Length of every header reference; a reference without one is an error
fn reference_lengths<F>(path: &Path, names: &[String], target_len: F) -> Result<Vec<usize>>
where
    F: Fn(u32) -> Option<u64>,
{
    names
        .iter()
        .enumerate()
        .map(|(tid, name)| {
            target_len(tid as u32)
                .map(|len| len as usize)
                .ok_or_else(|| RiboError::open(path, format!("header reference {name} has no length")))
        })
        .collect()
}

/// SAM/BAM/CRAM file opened through htslib
pub struct AlignmentSource {
    reader: bam::Reader,
    reference_names: Vec<String>,
    chromosomes: ChromosomeTable,
}

impl AlignmentSource {
    pub fn open<P: AsRef<Path>>(path: P, rules: &NameRules) -> Result<Self> {
        let path = path.as_ref();
        let reader = bam::Reader::from_path(path).map_err(|e| RiboError::open(path, e))?;

        let header = reader.header();
        let reference_names: Vec<String> = header
            .target_names()
            .iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect();
        if reference_names.is_empty() {
            return Err(RiboError::open(path, "header declares no reference sequences"));
        }
        let lengths = reference_lengths(path, &reference_names, |tid| header.target_len(tid))?;

        let chromosomes = ChromosomeTable::from_header(
            reference_names.iter().map(String::as_str).zip(lengths.iter().copied()),
            rules,
        );
        debug!(
            "{}: {} header references, {} chromosomes after normalisation",
            path.display(),
            reference_names.len(),
            chromosomes.len()
        );

        Ok(Self {
            reader,
            reference_names,
            chromosomes,
        })
    }

    pub fn chromosomes(&self) -> &ChromosomeTable {
        &self.chromosomes
    }

    /// Stream all records in file order
    pub fn records(&mut self) -> impl Iterator<Item = Result<AlignmentRecord>> + '_ {
        let names = &self.reference_names;
        self.reader.records().map(move |res| {
            let record = res?;
            Ok(convert_record(&record, names))
        })
    }
}

fn convert_record(record: &bam::Record, names: &[String]) -> AlignmentRecord {
    let name = String::from_utf8_lossy(record.qname()).into_owned();
    let reference = usize::try_from(record.tid())
        .ok()
        .and_then(|tid| names.get(tid));

    match reference {
        Some(reference) if !record.is_unmapped() => AlignmentRecord {
            name,
            reference: reference.clone(),
            start: record.pos(),
            end: record.reference_end(),
            strand: if record.is_reverse() {
                Strand::Reverse
            } else {
                Strand::Forward
            },
            mapped: true,
        },
        _ => AlignmentRecord::unmapped(name),
    }
}
