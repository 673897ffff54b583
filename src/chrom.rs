/// Chromosome identifiers and lengths
///
/// Reference names in alignment headers are normalised to the identifiers used
/// in annotation tables and emitted tracks. The same rule set is applied when
/// counting and when writing, so a read can never be counted under a name the
/// writer does not know about.
use indexmap::IndexMap;
use log::warn;

/// One normalisation rule. Rules are tried in order and the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRule {
    /// "Chr1" -> "1"
    StripPrefix(String),
    /// "AT1G01010.1" -> "1": the character following the prefix names the chromosome
    GeneLocus(String),
}

impl NameRule {
    fn apply<'a>(&self, name: &'a str) -> Option<&'a str> {
        match self {
            NameRule::StripPrefix(prefix) => name.strip_prefix(prefix.as_str()),
            NameRule::GeneLocus(prefix) => {
                let rest = name.strip_prefix(prefix.as_str())?;
                let c = rest.chars().next()?;
                Some(&rest[..c.len_utf8()])
            }
        }
    }
}

/// Ordered rule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRules {
    rules: Vec<NameRule>,
}

impl NameRules {
    pub fn new(rules: Vec<NameRule>) -> Self {
        Self { rules }
    }

    /// Rules that leave every name untouched
    pub fn verbatim() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn normalize(&self, name: &str) -> String {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(name))
            .unwrap_or(name)
            .to_string()
    }
}

impl Default for NameRules {
    /// Arabidopsis conventions: "Chr" prefixed assemblies and AGI locus names
    fn default() -> Self {
        Self::new(vec![
            NameRule::StripPrefix("Chr".to_string()),
            NameRule::GeneLocus("AT".to_string()),
        ])
    }
}

/// Normalised chromosome id -> length, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChromosomeTable {
    lengths: IndexMap<String, usize>,
}

impl ChromosomeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw header entries.
    ///
    /// Entries that normalise to an identifier already seen keep the position
    /// of the first occurrence and the larger of the two lengths.
    pub fn from_header<'a, I>(entries: I, rules: &NameRules) -> Self
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        let mut table = Self::new();
        for (raw, length) in entries {
            let id = rules.normalize(raw);
            table.insert_merged(raw, id, length);
        }
        table
    }

    fn insert_merged(&mut self, raw: &str, id: String, length: usize) {
        match self.lengths.get_mut(&id) {
            Some(existing) => {
                warn!(
                    "Reference {raw} normalises to already seen chromosome {id}; \
                     merging (length {} -> {})",
                    existing,
                    (*existing).max(length)
                );
                *existing = (*existing).max(length);
            }
            None => {
                self.lengths.insert(id, length);
            }
        }
    }

    /// Add an already normalised chromosome
    pub fn insert(&mut self, id: impl Into<String>, length: usize) {
        let id = id.into();
        let raw = id.clone();
        self.insert_merged(&raw, id, length);
    }

    pub fn length(&self, id: &str) -> Option<usize> {
        self.lengths.get(id).copied()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.lengths.get_index_of(id)
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Iterate in header order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.lengths.iter().map(|(id, &len)| (id.as_str(), len))
    }

    pub fn total_length(&self) -> usize {
        self.lengths.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = NameRules::default();
        assert_eq!(rules.normalize("Chr1"), "1");
        assert_eq!(rules.normalize("ChrM"), "M");
        assert_eq!(rules.normalize("AT1G01010.1"), "1");
        assert_eq!(rules.normalize("ATMG00010.1"), "M");
        assert_eq!(rules.normalize("Mt"), "Mt");
        assert_eq!(rules.normalize("5"), "5");
        // A bare prefix has no chromosome character to extract
        assert_eq!(rules.normalize("AT"), "AT");
    }

    #[test]
    fn test_verbatim_rules() {
        let rules = NameRules::verbatim();
        assert_eq!(rules.normalize("Chr1"), "Chr1");
    }

    #[test]
    fn test_table_keeps_header_order() {
        let rules = NameRules::default();
        let table = ChromosomeTable::from_header(
            [("Chr3", 30), ("Chr1", 10), ("ChrC", 5), ("Chr2", 20)],
            &rules,
        );
        let ids: Vec<&str> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["3", "1", "C", "2"]);
        assert_eq!(table.length("1"), Some(10));
        assert_eq!(table.index_of("C"), Some(2));
        assert_eq!(table.total_length(), 65);
    }

    #[test]
    fn test_table_merges_collapsed_names() {
        let rules = NameRules::default();
        let table = ChromosomeTable::from_header(
            [("AT1G01010.1", 1500), ("AT2G01010.1", 900), ("AT1G01020.1", 2100)],
            &rules,
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.length("1"), Some(2100));
        assert_eq!(table.index_of("1"), Some(0));
        assert_eq!(table.index_of("2"), Some(1));
    }
}
