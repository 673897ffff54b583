/// P-site projection of alignments into strand-specific tracks
use crate::alignment::{AlignmentRecord, Strand};
use crate::chrom::{ChromosomeTable, NameRules};
use crate::error::{Result, RiboError};
use crate::track::SignalTrack;
use log::{debug, info};
use std::collections::HashMap;

/// Distance from a read's 5' end to its P-site for 28-30 nt footprints
pub const DEFAULT_P_SITE_OFFSET: i64 = 14;

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub p_site_offset: i64,
    pub name_rules: NameRules,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            p_site_offset: DEFAULT_P_SITE_OFFSET,
            name_rules: NameRules::default(),
        }
    }
}

/// 0-based P-site of a mapped read. `end` is exclusive, hence the -1 on the reverse strand.
pub fn p_site_position(record: &AlignmentRecord, offset: i64) -> i64 {
    match record.strand {
        Strand::Forward => record.start + offset,
        Strand::Reverse => record.end - 1 - offset,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub mapped: u64,
    pub unmapped: u64,
    pub forward: u64,
    pub reverse: u64,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub forward: SignalTrack,
    pub reverse: SignalTrack,
    pub stats: ExtractStats,
}

/// Accumulates P-site counts. Reference names are resolved to table indices
/// through a cache, so each distinct raw name is normalised once.
pub struct PSiteCounter<'a> {
    chromosomes: &'a ChromosomeTable,
    config: &'a ExtractConfig,
    resolved: HashMap<String, usize>,
    forward: SignalTrack,
    reverse: SignalTrack,
    stats: ExtractStats,
}

impl<'a> PSiteCounter<'a> {
    pub fn new(chromosomes: &'a ChromosomeTable, config: &'a ExtractConfig) -> Self {
        Self {
            chromosomes,
            config,
            resolved: HashMap::new(),
            forward: SignalTrack::zeroed("forward", chromosomes),
            reverse: SignalTrack::zeroed("reverse", chromosomes),
            stats: ExtractStats::default(),
        }
    }

    fn chromosome_index(&mut self, reference: &str) -> Result<usize> {
        if let Some(&idx) = self.resolved.get(reference) {
            return Ok(idx);
        }
        let id = self.config.name_rules.normalize(reference);
        let idx = self
            .chromosomes
            .index_of(&id)
            .ok_or(RiboError::UnknownChromosome { name: id })?;
        self.resolved.insert(reference.to_string(), idx);
        Ok(idx)
    }

    pub fn add(&mut self, record: &AlignmentRecord) -> Result<()> {
        if !record.mapped {
            self.stats.unmapped += 1;
            return Ok(());
        }

        let idx = self.chromosome_index(&record.reference)?;
        let position = p_site_position(record, self.config.p_site_offset);

        let track = match record.strand {
            Strand::Forward => &mut self.forward,
            Strand::Reverse => &mut self.reverse,
        };
        let (chrom, counts) = track
            .values_at_mut(idx)
            .ok_or_else(|| RiboError::UnknownChromosome {
                name: record.reference.clone(),
            })?;

        let length = counts.len();
        let slot = usize::try_from(position)
            .ok()
            .and_then(|p| counts.get_mut(p))
            .ok_or_else(|| RiboError::OffsetGeometry {
                read: record.name.clone(),
                chrom: chrom.to_string(),
                position,
                length,
            })?;
        *slot += 1;

        self.stats.mapped += 1;
        match record.strand {
            Strand::Forward => self.stats.forward += 1,
            Strand::Reverse => self.stats.reverse += 1,
        }
        Ok(())
    }

    pub fn finish(self) -> Extraction {
        Extraction {
            forward: self.forward,
            reverse: self.reverse,
            stats: self.stats,
        }
    }
}

/// Project every mapped record onto its P-site.
///
/// Any record whose P-site leaves its chromosome aborts the run; nothing is
/// clamped or dropped.
pub fn extract<I>(records: I, chromosomes: &ChromosomeTable, config: &ExtractConfig) -> Result<Extraction>
where
    I: IntoIterator<Item = Result<AlignmentRecord>>,
{
    let mut counter = PSiteCounter::new(chromosomes, config);
    for record in records {
        counter.add(&record?)?;
    }
    let extraction = counter.finish();

    info!(
        "Projected {} mapped reads ({} forward, {} reverse); skipped {} unmapped",
        extraction.stats.mapped,
        extraction.stats.forward,
        extraction.stats.reverse,
        extraction.stats.unmapped
    );
    for (chrom, _) in chromosomes.iter() {
        debug!(
            "chromosome {chrom}: {} forward, {} reverse",
            extraction.forward.chromosome_total(chrom).unwrap_or(0),
            extraction.reverse.chromosome_total(chrom).unwrap_or(0)
        );
    }
    Ok(extraction)
}
