/// Dense per-chromosome signal tracks and their fixed-step text form
///
/// Every chromosome of the table gets a vector of exactly its length, so the
/// emitted track always covers every base in header order.
use crate::chrom::ChromosomeTable;
use crate::error::{Result, RiboError};
use indexmap::IndexMap;
use log::{debug, warn};
use noodles::bgzf;
use rayon::prelude::*;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Position-resolved counts for one strand
#[derive(Debug, Clone, PartialEq)]
pub struct SignalTrack<T = u32> {
    name: String,
    chroms: IndexMap<String, Vec<T>>,
}

impl<T: Clone + Default> SignalTrack<T> {
    /// Zero-filled track covering every chromosome of the table
    pub fn zeroed(name: impl Into<String>, chromosomes: &ChromosomeTable) -> Self {
        let chroms = chromosomes
            .iter()
            .map(|(id, len)| (id.to_string(), vec![T::default(); len]))
            .collect();
        Self {
            name: name.into(),
            chroms,
        }
    }
}

impl<T> SignalTrack<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, chrom: &str) -> Option<&[T]> {
        self.chroms.get(chrom).map(|v| v.as_slice())
    }

    /// Mutable values of the chromosome at a table index
    pub fn values_at_mut(&mut self, index: usize) -> Option<(&str, &mut Vec<T>)> {
        self.chroms
            .get_index_mut(index)
            .map(|(id, values)| (id.as_str(), values))
    }

    pub fn num_chromosomes(&self) -> usize {
        self.chroms.len()
    }

    /// Iterate chromosomes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.chroms.iter().map(|(id, v)| (id.as_str(), v.as_slice()))
    }
}

impl SignalTrack<u32> {
    pub fn total(&self) -> u64 {
        self.chroms
            .values()
            .flat_map(|v| v.iter())
            .map(|&c| c as u64)
            .sum()
    }

    pub fn chromosome_total(&self, chrom: &str) -> Option<u64> {
        self.get(chrom).map(|v| v.iter().map(|&c| c as u64).sum())
    }
}

/// Write the fixed-step text form of a track
pub fn write_track<T: Display, W: Write>(track: &SignalTrack<T>, out: W) -> std::io::Result<()> {
    let mut out = BufWriter::new(out);
    writeln!(out, "track type=wiggle_0 name={}", track.name)?;
    for (chrom, values) in track.iter() {
        writeln!(out, "fixedStep chrom={chrom} start=1 step=1")?;
        for v in values {
            writeln!(out, "{v}")?;
        }
    }
    out.flush()
}

/// Write several tracks so that either all destination files appear or none do.
///
/// Each track is written to a temporary file next to its destination; the
/// temporaries are renamed into place only after every write succeeded.
pub fn write_tracks_atomic<T: Display + Sync>(tracks: &[(&SignalTrack<T>, &Path)]) -> Result<()> {
    let staged: Vec<(NamedTempFile, &Path)> = tracks
        .par_iter()
        .map(|&(track, path)| {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let mut temp = NamedTempFile::new_in(dir).map_err(|e| RiboError::open(dir, e))?;
            write_track(track, temp.as_file_mut())?;
            Ok((temp, path))
        })
        .collect::<Result<_>>()?;

    persist_all(staged)?;
    Ok(())
}

/// Rename staged temporaries into place. If a rename fails, destinations
/// already renamed in this call are removed again; a file that existed at
/// such a destination before the call is not restored.
pub(crate) fn persist_all(staged: Vec<(NamedTempFile, &Path)>) -> Result<()> {
    let mut done: Vec<&Path> = Vec::with_capacity(staged.len());
    for (temp, path) in staged {
        if let Err(e) = temp.persist(path) {
            for written in done {
                if let Err(cleanup) = std::fs::remove_file(written) {
                    warn!("Cannot remove partial output {}: {cleanup}", written.display());
                }
            }
            return Err(RiboError::Io(e.error));
        }
        debug!("Wrote {}", path.display());
        done.push(path);
    }
    Ok(())
}

/// Open a track file, transparently decompressing bgzip input
pub fn open_track_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RiboError::open(path, e))?;

    let is_compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz" || ext == "bgz")
        .unwrap_or(false);

    if is_compressed {
        Ok(Box::new(BufReader::new(bgzf::io::reader::Reader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read a fixed-step track from disk
pub fn read_track<P: AsRef<Path>>(path: P) -> Result<SignalTrack<f64>> {
    let path = path.as_ref();
    let input = open_track_input(path)?;
    parse_track(input, path)
}

/// Parse fixed-step text. `start` other than 1 is zero-filled up to the first value;
/// `step` and `span` must be 1 because the result is a dense per-base vector.
pub fn parse_track<R: BufRead>(reader: R, source: &Path) -> Result<SignalTrack<f64>> {
    let mut track = SignalTrack {
        name: String::new(),
        chroms: IndexMap::new(),
    };
    let mut current: Option<usize> = None;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with("browser") {
            continue;
        }

        if line.starts_with("track") {
            if let Some(name) = line.split_whitespace().find_map(|t| t.strip_prefix("name=")) {
                track.name = name.trim_matches('"').to_string();
            }
            continue;
        }

        if line.starts_with("variableStep") {
            return Err(RiboError::parse(
                source,
                line_no,
                "variableStep sections are not supported",
            ));
        }

        if line.starts_with("fixedStep") {
            let decl = parse_fixed_step(line).map_err(|m| RiboError::parse(source, line_no, m))?;
            if track.chroms.contains_key(&decl.chrom) {
                return Err(RiboError::parse(
                    source,
                    line_no,
                    format!("chromosome {} declared twice", decl.chrom),
                ));
            }
            let (index, _) = track
                .chroms
                .insert_full(decl.chrom, vec![0.0; decl.start - 1]);
            current = Some(index);
            continue;
        }

        let value: f64 = line
            .parse()
            .map_err(|_| RiboError::parse(source, line_no, format!("invalid value '{line}'")))?;
        match current.and_then(|idx| track.chroms.get_index_mut(idx)) {
            Some((_, values)) => values.push(value),
            None => {
                return Err(RiboError::parse(
                    source,
                    line_no,
                    "value before any fixedStep declaration",
                ))
            }
        }
    }

    debug!(
        "Read track '{}' from {}: {} chromosomes",
        track.name,
        source.display(),
        track.chroms.len()
    );
    Ok(track)
}

struct FixedStep {
    chrom: String,
    start: usize,
}

fn parse_fixed_step(line: &str) -> std::result::Result<FixedStep, String> {
    let mut chrom = None;
    let mut start = 1usize;

    for token in line.split_whitespace().skip(1) {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| format!("malformed fixedStep field '{token}'"))?;
        match key {
            "chrom" => chrom = Some(value.to_string()),
            "start" => {
                start = value
                    .parse()
                    .ok()
                    .filter(|&s| s >= 1)
                    .ok_or_else(|| format!("invalid start '{value}'"))?;
            }
            "step" | "span" => {
                if value != "1" {
                    return Err(format!("only {key}=1 is supported, got {key}={value}"));
                }
            }
            _ => return Err(format!("unknown fixedStep field '{key}'")),
        }
    }

    let chrom = chrom.ok_or_else(|| "fixedStep without chrom=".to_string())?;
    Ok(FixedStep { chrom, start })
}
