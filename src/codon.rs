/// Codon utilities: genetic code, reverse complement and codon groupings
use crate::error::{Result, RiboError};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Standard genetic code, codons ordered T, C, A, G at each position
const STANDARD_CODE: &[u8; 64] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

const BASES: [u8; 4] = [b'T', b'C', b'A', b'G'];

/// Leucine codons, the default highlighted subset
pub const LEUCINE_CODONS: [&str; 6] = ["CTA", "CTG", "CTC", "CTT", "TTA", "TTG"];

fn base_index(b: u8) -> Option<usize> {
    match b.to_ascii_uppercase() {
        b'T' | b'U' => Some(0),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

/// One-letter amino acid (or '*') for a codon; None for ambiguous bases
pub fn translate_codon(codon: &[u8]) -> Option<char> {
    if codon.len() != 3 {
        return None;
    }
    let idx = base_index(codon[0])? * 16 + base_index(codon[1])? * 4 + base_index(codon[2])?;
    Some(STANDARD_CODE[idx] as char)
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b.to_ascii_uppercase() {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            _ => b'N',
        })
        .collect()
}

/// Group label -> member codons. Labels iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodonGroups {
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl CodonGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// All 64 codons grouped by the amino acid they encode (stops under "*")
    pub fn standard_amino_acids() -> Self {
        let mut groups = Self::new();
        for (i, &aa) in STANDARD_CODE.iter().enumerate() {
            let codon = [BASES[i / 16], BASES[(i / 4) % 4], BASES[i % 4]];
            groups.insert(
                (aa as char).to_string(),
                String::from_utf8_lossy(&codon).into_owned(),
            );
        }
        groups
    }

    pub fn insert(&mut self, label: impl Into<String>, codon: impl Into<String>) {
        self.groups
            .entry(label.into())
            .or_default()
            .insert(codon.into().to_ascii_uppercase());
    }

    /// Load groups from a tab-delimited file: `label<TAB>codon[,codon...]`.
    /// A label may appear on several lines.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RiboError::open(path, e))?;
        let mut groups = Self::new();

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (label, codons) = line
                .split_once('\t')
                .ok_or_else(|| RiboError::parse(path, i + 1, "expected label<TAB>codons"))?;
            for codon in codons.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                if translate_codon(codon.as_bytes()).is_none() {
                    return Err(RiboError::parse(
                        path,
                        i + 1,
                        format!("'{codon}' is not a codon"),
                    ));
                }
                groups.insert(label.trim(), codon);
            }
        }
        Ok(groups)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate() {
        assert_eq!(translate_codon(b"ATG"), Some('M'));
        assert_eq!(translate_codon(b"TAA"), Some('*'));
        assert_eq!(translate_codon(b"ctg"), Some('L'));
        assert_eq!(translate_codon(b"GGN"), None);
        assert_eq!(translate_codon(b"GG"), None);
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ATGC"), b"GCAT".to_vec());
        assert_eq!(reverse_complement(b"aaN"), b"NTT".to_vec());
    }

    #[test]
    fn test_standard_groups() {
        let groups = CodonGroups::standard_amino_acids();
        assert_eq!(groups.len(), 21);
        let leu: Vec<&str> = groups.get("L").unwrap().iter().map(|s| s.as_str()).collect();
        let mut expected = LEUCINE_CODONS.to_vec();
        expected.sort();
        assert_eq!(leu, expected);
        assert_eq!(groups.get("*").unwrap().len(), 3);
        assert_eq!(groups.get("W").unwrap().len(), 1);

        let labels: Vec<&str> = groups.iter().map(|(l, _)| l).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }

    #[test]
    fn test_groups_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("groups.tsv");
        std::fs::write(&path, "# label\tcodons\nLeu\tCTA,ctg\nLeu\tTTA\nMet\tATG\n").unwrap();

        let groups = CodonGroups::from_path(&path).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get("Leu").unwrap().len(), 3);
        assert!(groups.get("Leu").unwrap().contains("CTG"));

        std::fs::write(&path, "Leu\tCTAG\n").unwrap();
        assert!(CodonGroups::from_path(&path).is_err());
        std::fs::write(&path, "Leu\tCTN\n").unwrap();
        assert!(CodonGroups::from_path(&path).is_err());
    }
}
