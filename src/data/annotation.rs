//! Probe-to-gene annotation lookup.

use crate::error::{GexError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Mapping from probe identifiers to gene symbols.
///
/// Many probes may map to the same gene symbol; each probe maps to exactly
/// one symbol.
#[derive(Debug, Clone, Default)]
pub struct ProbeAnnotation {
    genes: HashMap<String, String>,
}

impl ProbeAnnotation {
    /// Create an annotation from (probe, gene) pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            genes: pairs
                .into_iter()
                .map(|(p, g)| (p.into(), g.into()))
                .collect(),
        }
    }

    /// Load an annotation from a TSV file.
    ///
    /// Expected format: header row, then one `probe_id\tgene_symbol` row per
    /// probe. Extra columns are ignored.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| GexError::EmptyData("Empty annotation file".to_string()))??;
        if header_line.split('\t').count() < 2 {
            return Err(GexError::MissingColumn("gene_symbol".to_string()));
        }

        let mut genes = HashMap::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let probe_id = match fields.next() {
                Some(p) if !p.trim().is_empty() => p.trim().to_string(),
                _ => continue,
            };
            let gene = fields
                .next()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .ok_or_else(|| GexError::MissingColumn("gene_symbol".to_string()))?;
            genes.insert(probe_id, gene);
        }

        if genes.is_empty() {
            return Err(GexError::EmptyData("No probes in annotation".to_string()));
        }

        Ok(Self { genes })
    }

    /// Gene symbol for a probe, if annotated.
    pub fn gene(&self, probe_id: &str) -> Option<&str> {
        self.genes.get(probe_id).map(String::as_str)
    }

    /// Gene symbol for a probe; unknown probes are an error.
    pub fn require_gene(&self, probe_id: &str) -> Result<&str> {
        self.gene(probe_id).ok_or_else(|| {
            GexError::ProbeMismatch(format!("Probe '{}' not found in annotation", probe_id))
        })
    }

    /// Number of annotated probes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether the annotation is empty.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_tsv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe_id\tgene_symbol\textra").unwrap();
        writeln!(file, "p1\tGAPDH\tx").unwrap();
        writeln!(file, "p2\tGAPDH\ty").unwrap();
        writeln!(file, "p3\tTNF\tz").unwrap();
        file.flush().unwrap();

        let ann = ProbeAnnotation::from_tsv(file.path()).unwrap();
        assert_eq!(ann.len(), 3);
        assert_eq!(ann.gene("p1"), Some("GAPDH"));
        assert_eq!(ann.gene("p2"), Some("GAPDH"));
        assert_eq!(ann.gene("p3"), Some("TNF"));
        assert_eq!(ann.gene("p4"), None);
    }

    #[test]
    fn test_require_gene() {
        let ann = ProbeAnnotation::from_pairs([("p1", "IFNG")]);
        assert_eq!(ann.require_gene("p1").unwrap(), "IFNG");
        assert!(ann.require_gene("missing").is_err());
    }

    #[test]
    fn test_missing_gene_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe_id").unwrap();
        writeln!(file, "p1").unwrap();
        file.flush().unwrap();

        assert!(ProbeAnnotation::from_tsv(file.path()).is_err());
    }
}
