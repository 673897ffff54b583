/// Codon-level pause scores
///
/// Each gene contributes one scored site: the footprint density read at the
/// requested ribosome site for anchor `z`, filed under the codon that holds
/// that position in the gene's coding sequence.
/// Scores are collected per prediction channel into separate tables and
/// summarised per codon group once all genes are processed.
use crate::annotation::AnnotationRecord;
use crate::codon::{CodonGroups, LEUCINE_CODONS};
use crate::error::{Result, RiboError};
use crate::reference::SequenceSource;
use crate::track::SignalTrack;
use indexmap::IndexMap;
use log::{debug, info};
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Codon flank subtracted from the anchor position, in nucleotides
pub const WINDOW_FLANK: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RibosomeSite {
    A,
    P,
    E,
}

impl FromStr for RibosomeSite {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RibosomeSite::A),
            "P" => Ok(RibosomeSite::P),
            "E" => Ok(RibosomeSite::E),
            other => Err(format!("Unknown ribosome site '{other}', expected A, P or E")),
        }
    }
}

impl fmt::Display for RibosomeSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RibosomeSite::A => "A",
            RibosomeSite::P => "P",
            RibosomeSite::E => "E",
        };
        f.write_str(s)
    }
}

/// Nucleotide offsets of the three sites, one codon apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteOffsets {
    pub a: i64,
    pub p: i64,
    pub e: i64,
}

impl Default for SiteOffsets {
    fn default() -> Self {
        Self { a: 0, p: 3, e: 6 }
    }
}

impl SiteOffsets {
    pub fn offset(&self, site: RibosomeSite) -> i64 {
        match site {
            RibosomeSite::A => self.a,
            RibosomeSite::P => self.p,
            RibosomeSite::E => self.e,
        }
    }
}

/// Where in a gene's density window a pause is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteGeometry {
    pub site: RibosomeSite,
    /// A-site offset of the density windows; also shifts window extraction
    pub reference_offset: i64,
    pub offsets: SiteOffsets,
}

impl Default for SiteGeometry {
    fn default() -> Self {
        Self {
            site: RibosomeSite::A,
            reference_offset: 0,
            offsets: SiteOffsets::default(),
        }
    }
}

impl SiteGeometry {
    pub fn shift(&self) -> i64 {
        self.offsets.offset(self.site) - self.reference_offset
    }

    /// Unchecked density index for an anchor codon
    pub fn density_index(&self, anchor: i64) -> i64 {
        anchor * 3 + 1 - WINDOW_FLANK + self.shift()
    }

    /// Density index validated against the window of gene `gene`
    pub fn resolve(&self, gene: usize, anchor: i64, window_len: usize) -> Result<usize> {
        let index = self.density_index(anchor);
        usize::try_from(index)
            .ok()
            .filter(|&i| i < window_len)
            .ok_or(RiboError::GeometryMismatch {
                gene,
                index,
                window_len,
            })
    }
}

/// Source of the value recorded for a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Footprint density at the resolved index
    Observed,
    /// The gene's model prediction
    Predicted,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Observed, Channel::Predicted];

    pub fn label(&self) -> &'static str {
        match self {
            Channel::Observed => "observed",
            Channel::Predicted => "predicted",
        }
    }
}

/// Per-gene inputs aligned by gene index. Only `new` and `load` build one,
/// so every vector has the same length.
#[derive(Debug, Clone, Default)]
pub struct GeneInputs {
    densities: Vec<Vec<f64>>,
    sequences: Vec<Vec<u8>>,
    z_index: Vec<i64>,
    predictions: Vec<f64>,
}

impl GeneInputs {
    pub fn new(
        densities: Vec<Vec<f64>>,
        sequences: Vec<Vec<u8>>,
        z_index: Vec<i64>,
        predictions: Vec<f64>,
    ) -> Result<Self> {
        let n = densities.len();
        for (what, found) in [
            ("sequences", sequences.len()),
            ("z-index", z_index.len()),
            ("predictions", predictions.len()),
        ] {
            if found != n {
                return Err(RiboError::LengthMismatch {
                    what: what.to_string(),
                    expected: n,
                    found,
                });
            }
        }
        Ok(Self {
            densities,
            sequences,
            z_index,
            predictions,
        })
    }

    /// Reconstruct density windows and codon sequences for every annotation
    pub fn load<S: SequenceSource + ?Sized>(
        annotations: &[AnnotationRecord],
        forward: &SignalTrack<f64>,
        reverse: &SignalTrack<f64>,
        reference: &S,
        z_index: Vec<i64>,
        predictions: Vec<f64>,
        geometry: &SiteGeometry,
    ) -> Result<Self> {
        for (what, found) in [("z-index", z_index.len()), ("predictions", predictions.len())] {
            if found != annotations.len() {
                return Err(RiboError::LengthMismatch {
                    what: what.to_string(),
                    expected: annotations.len(),
                    found,
                });
            }
        }

        let per_gene: Vec<(Vec<f64>, Vec<u8>)> = annotations
            .iter()
            .enumerate()
            .map(|(g, ann)| {
                let window = ann.density_window(g, forward, reverse, geometry.reference_offset)?;
                let seq = ann.codon_sequence(reference)?;
                Ok((window, seq))
            })
            .collect::<Result<_>>()?;
        let (densities, sequences): (Vec<Vec<f64>>, Vec<Vec<u8>>) = per_gene.into_iter().unzip();

        debug!("Loaded density windows for {} genes", annotations.len());
        Self::new(densities, sequences, z_index, predictions)
    }

    pub fn len(&self) -> usize {
        self.densities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.densities.is_empty()
    }

    pub fn density(&self, gene: usize) -> Option<&[f64]> {
        self.densities.get(gene).map(Vec::as_slice)
    }

    pub fn sequence(&self, gene: usize) -> Option<&[u8]> {
        self.sequences.get(gene).map(Vec::as_slice)
    }

    pub fn anchor(&self, gene: usize) -> Option<i64> {
        self.z_index.get(gene).copied()
    }

    pub fn prediction(&self, gene: usize) -> Option<f64> {
        self.predictions.get(gene).copied()
    }
}

/// Codon -> pause values for one channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PauseScoreTable {
    scores: IndexMap<String, Vec<f64>>,
}

impl PauseScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, codon: &str, value: f64) {
        match self.scores.get_mut(codon) {
            Some(values) => values.push(value),
            None => {
                self.scores.insert(codon.to_string(), vec![value]);
            }
        }
    }

    pub fn get(&self, codon: &str) -> Option<&[f64]> {
        self.scores.get(codon).map(|v| v.as_slice())
    }

    pub fn mean(&self, codon: &str) -> Option<f64> {
        self.get(codon).and_then(|v| mean(v.iter()))
    }

    /// Codons in table order (alphabetical once finalised)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.scores.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn num_sites(&self) -> usize {
        self.scores.values().map(|v| v.len()).sum()
    }

    fn sort(&mut self) {
        self.scores.sort_keys();
    }

    /// Mean over all values of all listed codons; None when nothing was recorded
    pub fn pooled_mean<'a, I>(&self, codons: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        mean(
            codons
                .into_iter()
                .filter_map(|c| self.scores.get(c))
                .flat_map(|v| v.iter()),
        )
    }
}

fn mean<'a, I: Iterator<Item = &'a f64>>(values: I) -> Option<f64> {
    let (sum, n) = values.fold((0.0f64, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// One gene's scored site
#[derive(Debug, Clone, PartialEq)]
pub struct SiteScore {
    pub gene: usize,
    pub codon: String,
    /// One value per configured channel, in channel order
    pub values: Vec<f64>,
}

/// Score gene `gene`: resolve the density index for its anchor, then take the
/// codon of the coding sequence that contains that index.
pub fn score_gene(
    inputs: &GeneInputs,
    gene: usize,
    geometry: &SiteGeometry,
    channels: &[Channel],
) -> Result<SiteScore> {
    let (Some(density), Some(sequence), Some(anchor), Some(prediction)) = (
        inputs.density(gene),
        inputs.sequence(gene),
        inputs.anchor(gene),
        inputs.prediction(gene),
    ) else {
        return Err(RiboError::GeneOutOfRange {
            gene,
            genes: inputs.len(),
        });
    };

    let index = geometry.resolve(gene, anchor, density.len())?;

    // Window and sequence share gene coordinates
    let codon_start = index / 3 * 3;
    let codon = sequence
        .get(codon_start..codon_start + 3)
        .ok_or(RiboError::CodonOutOfRange {
            gene,
            index: codon_start as i64,
            sequence_len: sequence.len(),
        })?;

    let values = channels
        .iter()
        .map(|channel| match channel {
            Channel::Observed => density[index],
            Channel::Predicted => prediction,
        })
        .collect();

    Ok(SiteScore {
        gene,
        codon: String::from_utf8_lossy(codon).to_ascii_uppercase(),
        values,
    })
}

/// Running tables, one per channel. Channels never share a table.
#[derive(Debug, Clone)]
pub struct PauseAccumulator {
    channels: Vec<Channel>,
    tables: Vec<PauseScoreTable>,
}

impl PauseAccumulator {
    pub fn new(channels: &[Channel]) -> Self {
        Self {
            channels: channels.to_vec(),
            tables: vec![PauseScoreTable::new(); channels.len()],
        }
    }

    pub fn add(&mut self, site: &SiteScore) {
        for (table, &value) in self.tables.iter_mut().zip(&site.values) {
            table.push(&site.codon, value);
        }
    }

    /// Sort tables by codon and compute the group and highlight summaries
    pub fn finalize(mut self, groups: &CodonGroups, highlight: &[String]) -> PauseReport {
        for table in &mut self.tables {
            table.sort();
        }

        let group_means = groups
            .iter()
            .map(|(label, codons)| GroupMean {
                label: label.to_string(),
                means: self
                    .tables
                    .iter()
                    .map(|t| t.pooled_mean(codons.iter().map(String::as_str)))
                    .collect(),
            })
            .collect();

        let highlight = highlight
            .iter()
            .map(|codon| CodonMean {
                codon: codon.clone(),
                means: self.tables.iter().map(|t| t.mean(codon)).collect(),
            })
            .collect();

        PauseReport {
            channels: self.channels,
            tables: self.tables,
            group_means,
            highlight,
        }
    }
}

/// Mean pause per group label, one entry per channel; None marks an empty group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMean {
    pub label: String,
    pub means: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodonMean {
    pub codon: String,
    pub means: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PauseReport {
    pub channels: Vec<Channel>,
    pub tables: Vec<PauseScoreTable>,
    pub group_means: Vec<GroupMean>,
    pub highlight: Vec<CodonMean>,
}

impl PauseReport {
    pub fn table(&self, channel: Channel) -> Option<&PauseScoreTable> {
        self.channels
            .iter()
            .position(|&c| c == channel)
            .map(|i| &self.tables[i])
    }
}

#[derive(Debug, Clone)]
pub struct AggregateConfig {
    pub geometry: SiteGeometry,
    pub channels: Vec<Channel>,
    pub highlight: Vec<String>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            geometry: SiteGeometry::default(),
            channels: Channel::ALL.to_vec(),
            highlight: LEUCINE_CODONS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Score every gene and summarise.
///
/// Genes are scored in parallel and merged in gene order, so the tables are
/// deterministic and a failure always names the lowest failing gene index.
pub fn aggregate(inputs: &GeneInputs, config: &AggregateConfig, groups: &CodonGroups) -> Result<PauseReport> {
    let scored: Vec<Result<SiteScore>> = (0..inputs.len())
        .into_par_iter()
        .map(|g| score_gene(inputs, g, &config.geometry, &config.channels))
        .collect();

    let mut acc = PauseAccumulator::new(&config.channels);
    for site in scored {
        acc.add(&site?);
    }

    let report = acc.finalize(groups, &config.highlight);
    for (channel, table) in report.channels.iter().zip(&report.tables) {
        info!(
            "{} channel: {} sites over {} codons",
            channel.label(),
            table.num_sites(),
            table.len()
        );
    }
    Ok(report)
}
