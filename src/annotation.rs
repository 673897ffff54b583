/// Gene annotations and their per-gene density windows / codon sequences
use crate::alignment::Strand;
use crate::codon::reverse_complement;
use crate::error::{Result, RiboError};
use crate::reference::SequenceSource;
use crate::track::SignalTrack;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Annotated coding segment, 1-based inclusive coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

impl AnnotationRecord {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64, strand: Strand) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            strand,
        }
    }

    pub fn len(&self) -> usize {
        (self.end + 1 - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Footprint densities over the gene in transcript orientation.
    ///
    /// The window is shifted by `site_offset` bases downstream of the annotated
    /// span (upstream in genome coordinates on the reverse strand).
    pub fn density_window(
        &self,
        gene: usize,
        forward: &SignalTrack<f64>,
        reverse: &SignalTrack<f64>,
        site_offset: i64,
    ) -> Result<Vec<f64>> {
        let (track, shift) = match self.strand {
            Strand::Forward => (forward, site_offset),
            Strand::Reverse => (reverse, -site_offset),
        };
        let values = track
            .get(&self.chrom)
            .ok_or_else(|| RiboError::UnknownChromosome {
                name: self.chrom.clone(),
            })?;

        let lo = self.start as i64 - 1 + shift;
        let hi = self.end as i64 + shift;
        if lo < 0 || hi > values.len() as i64 {
            return Err(RiboError::WindowOutOfRange {
                gene,
                chrom: self.chrom.clone(),
                start: lo,
                end: hi,
                length: values.len(),
            });
        }

        let mut window = values[lo as usize..hi as usize].to_vec();
        if self.strand == Strand::Reverse {
            window.reverse();
        }
        Ok(window)
    }

    /// Upper-cased gene sequence in transcript orientation
    pub fn codon_sequence<S: SequenceSource + ?Sized>(&self, reference: &S) -> Result<Vec<u8>> {
        let seq = reference.fetch(&self.chrom, self.start as usize - 1, self.end as usize)?;
        Ok(match self.strand {
            Strand::Forward => seq.to_ascii_uppercase(),
            Strand::Reverse => reverse_complement(&seq),
        })
    }
}

/// Read a tab-delimited annotation table: `chrom start end strand [...]`.
///
/// Lines starting with '#' are comments; a first line whose start column is
/// not numeric is treated as a header.
pub fn read_annotations<P: AsRef<Path>>(path: P) -> Result<Vec<AnnotationRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RiboError::open(path, e))?;
    parse_annotations(BufReader::new(file), path)
}

pub fn parse_annotations<R: BufRead>(reader: R, source: &Path) -> Result<Vec<AnnotationRecord>> {
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < 4 {
            return Err(RiboError::parse(
                source,
                line_no,
                format!("expected at least 4 columns, found {}", fields.len()),
            ));
        }

        let start = parse_coordinate(fields[1]);
        if records.is_empty() && start.is_none() && line_no == 1 {
            continue;
        }
        let start = start
            .ok_or_else(|| RiboError::parse(source, line_no, format!("invalid start '{}'", fields[1])))?;
        let end = parse_coordinate(fields[2])
            .ok_or_else(|| RiboError::parse(source, line_no, format!("invalid end '{}'", fields[2])))?;
        let strand: Strand = fields[3]
            .parse()
            .map_err(|m: String| RiboError::parse(source, line_no, m))?;

        if start == 0 || end < start {
            return Err(RiboError::parse(
                source,
                line_no,
                format!("invalid span {start}-{end} (1-based, inclusive)"),
            ));
        }

        records.push(AnnotationRecord::new(fields[0], start, end, strand));
    }

    Ok(records)
}

/// Coordinates exported by numeric tools may carry a ".0" suffix
fn parse_coordinate(field: &str) -> Option<u64> {
    field.parse::<u64>().ok().or_else(|| {
        let v: f64 = field.parse().ok()?;
        (v >= 0.0 && v.fract() == 0.0).then_some(v as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom::ChromosomeTable;
    use indexmap::IndexMap;

    fn tracks() -> (SignalTrack<f64>, SignalTrack<f64>) {
        let mut table = ChromosomeTable::new();
        table.insert("1", 10);
        let mut fwd: SignalTrack<f64> = SignalTrack::zeroed("forward", &table);
        let mut rev: SignalTrack<f64> = SignalTrack::zeroed("reverse", &table);
        let (_, f) = fwd.values_at_mut(0).unwrap();
        let (_, r) = rev.values_at_mut(0).unwrap();
        for i in 0..10 {
            f[i] = i as f64;
            r[i] = 100.0 + i as f64;
        }
        (fwd, rev)
    }

    #[test]
    fn test_forward_window() {
        let (fwd, rev) = tracks();
        let gene = AnnotationRecord::new("1", 3, 6, Strand::Forward);
        assert_eq!(gene.len(), 4);
        assert_eq!(gene.density_window(0, &fwd, &rev, 0).unwrap(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(gene.density_window(0, &fwd, &rev, 2).unwrap(), vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_reverse_window_in_transcript_order() {
        let (fwd, rev) = tracks();
        let gene = AnnotationRecord::new("1", 3, 6, Strand::Reverse);
        assert_eq!(
            gene.density_window(0, &fwd, &rev, 1).unwrap(),
            vec![104.0, 103.0, 102.0, 101.0]
        );
    }

    #[test]
    fn test_window_out_of_range() {
        let (fwd, rev) = tracks();
        let gene = AnnotationRecord::new("1", 8, 10, Strand::Forward);
        let err = gene.density_window(5, &fwd, &rev, 3).unwrap_err();
        assert!(matches!(
            err,
            RiboError::WindowOutOfRange { gene: 5, start: 10, end: 13, length: 10, .. }
        ));

        let missing = AnnotationRecord::new("2", 1, 3, Strand::Forward);
        assert!(missing.density_window(0, &fwd, &rev, 0).is_err());
    }

    #[test]
    fn test_codon_sequence() {
        let mut seqs = IndexMap::new();
        seqs.insert("1".to_string(), b"aaATGCCCTAAgg".to_vec());
        let fwd = AnnotationRecord::new("1", 3, 11, Strand::Forward);
        assert_eq!(fwd.codon_sequence(&seqs).unwrap(), b"ATGCCCTAA".to_vec());
        let rev = AnnotationRecord::new("1", 3, 11, Strand::Reverse);
        assert_eq!(rev.codon_sequence(&seqs).unwrap(), b"TTAGGGCAT".to_vec());
    }

    #[test]
    fn test_parse_annotations() {
        let text = "chrom\tstart\tend\tstrand\n1\t3\t11\t+\n# comment\n2\t20.0\t40\t-1\n";
        let recs = parse_annotations(text.as_bytes(), Path::new("ann.tsv")).unwrap();
        assert_eq!(
            recs,
            vec![
                AnnotationRecord::new("1", 3, 11, Strand::Forward),
                AnnotationRecord::new("2", 20, 40, Strand::Reverse),
            ]
        );

        let bad = "1\t30\t11\t+\n";
        assert!(parse_annotations(bad.as_bytes(), Path::new("ann.tsv")).is_err());
        let short = "1\t3\t11\n";
        assert!(parse_annotations(short.as_bytes(), Path::new("ann.tsv")).is_err());
        let strand = "1\t3\t11\t.\n";
        assert!(parse_annotations(strand.as_bytes(), Path::new("ann.tsv")).is_err());
    }
}
