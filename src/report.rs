/// Tab-separated pause-score reports
use crate::error::{Result, RiboError};
use crate::pause::PauseReport;
use crate::track::persist_all;
use log::info;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Marker for an undefined mean, distinct from a mean of zero
pub const MISSING: &str = "NA";

fn fmt_mean(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.6}"),
        None => MISSING.to_string(),
    }
}

/// codon, then `n` and mean for each channel
pub fn write_codon_scores<W: Write>(report: &PauseReport, out: W) -> std::io::Result<()> {
    let mut out = BufWriter::new(out);
    write!(out, "codon")?;
    for channel in &report.channels {
        write!(out, "\tn_{0}\tmean_{0}", channel.label())?;
    }
    writeln!(out)?;

    let mut codons: Vec<&str> = report
        .tables
        .iter()
        .flat_map(|t| t.iter().map(|(c, _)| c))
        .collect();
    codons.sort_unstable();
    codons.dedup();

    for codon in codons {
        write!(out, "{codon}")?;
        for table in &report.tables {
            let n = table.get(codon).map_or(0, |v| v.len());
            write!(out, "\t{n}\t{}", fmt_mean(table.mean(codon)))?;
        }
        writeln!(out)?;
    }
    out.flush()
}

pub fn write_group_means<W: Write>(report: &PauseReport, out: W) -> std::io::Result<()> {
    let mut out = BufWriter::new(out);
    write!(out, "group")?;
    for channel in &report.channels {
        write!(out, "\tmean_{}", channel.label())?;
    }
    writeln!(out)?;

    for group in &report.group_means {
        write!(out, "{}", group.label)?;
        for &m in &group.means {
            write!(out, "\t{}", fmt_mean(m))?;
        }
        writeln!(out)?;
    }
    out.flush()
}

pub fn write_highlight<W: Write>(report: &PauseReport, out: W) -> std::io::Result<()> {
    let mut out = BufWriter::new(out);
    write!(out, "codon")?;
    for channel in &report.channels {
        write!(out, "\tmean_{}", channel.label())?;
    }
    writeln!(out)?;

    for entry in &report.highlight {
        write!(out, "{}", entry.codon)?;
        for &m in &entry.means {
            write!(out, "\t{}", fmt_mean(m))?;
        }
        writeln!(out)?;
    }
    out.flush()
}

/// Output paths derived from a prefix
pub fn report_paths(prefix: &str) -> [PathBuf; 3] {
    [
        PathBuf::from(format!("{prefix}_codon_scores.tsv")),
        PathBuf::from(format!("{prefix}_group_means.tsv")),
        PathBuf::from(format!("{prefix}_highlight.tsv")),
    ]
}

/// Write all three reports; files appear only if every write succeeded
pub fn write_reports(report: &PauseReport, prefix: &str) -> Result<[PathBuf; 3]> {
    let paths = report_paths(prefix);
    let writers: [fn(&PauseReport, &mut std::fs::File) -> std::io::Result<()>; 3] = [
        |r, f| write_codon_scores(r, f),
        |r, f| write_group_means(r, f),
        |r, f| write_highlight(r, f),
    ];

    let mut staged = Vec::with_capacity(paths.len());
    for (path, write) in paths.iter().zip(writers) {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| RiboError::open(dir, e))?;
        write(report, temp.as_file_mut())?;
        staged.push((temp, path.as_path()));
    }
    persist_all(staged)?;
    for path in &paths {
        info!("Wrote {}", path.display());
    }
    Ok(paths)
}
