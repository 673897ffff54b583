/// End-to-end tests for the ribotrack extractor binary
///
/// Alignments are written as SAM, which htslib reads transparently.
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const HEADER: &str = "@HD\tVN:1.6\tSO:coordinate\n\
                      @SQ\tSN:Chr1\tLN:500\n\
                      @SQ\tSN:Chr2\tLN:300\n\
                      @SQ\tSN:ChrC\tLN:120\n";

fn sam_line(name: &str, flag: u16, chrom: &str, pos1: u64, cigar: &str) -> String {
    format!("{name}\t{flag}\t{chrom}\t{pos1}\t60\t{cigar}\t*\t0\t0\t*\t*\n")
}

fn write_sam(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("reads.sam");
    fs::write(&path, format!("{HEADER}{body}")).unwrap();
    path
}

fn run_extractor(input: &Path, prefix: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ribotrack"))
        .arg("-i")
        .arg(input)
        .arg("-o")
        .arg(prefix)
        .arg("--quiet")
        .args(extra)
        .output()
        .expect("failed to run ribotrack")
}

/// Split a track into (chrom, counts) sections in file order
fn sections(text: &str) -> Vec<(String, Vec<u64>)> {
    let mut out: Vec<(String, Vec<u64>)> = Vec::new();
    for line in text.lines().skip(1) {
        if let Some(rest) = line.strip_prefix("fixedStep chrom=") {
            let chrom = rest.split_whitespace().next().unwrap().to_string();
            assert!(line.ends_with("start=1 step=1"), "bad declaration: {line}");
            out.push((chrom, Vec::new()));
        } else {
            out.last_mut().unwrap().1.push(line.parse().unwrap());
        }
    }
    out
}

#[test]
fn test_forward_read_lands_on_p_site() -> Result<()> {
    let dir = TempDir::new()?;
    let sam = write_sam(dir.path(), &sam_line("r1", 0, "Chr1", 101, "30M"));
    let prefix = dir.path().join("out");

    let output = run_extractor(&sam, &prefix, &[]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let forward = fs::read_to_string(dir.path().join("out_f.wig"))?;
    assert!(forward.starts_with("track type=wiggle_0 name=forward\n"));
    let fwd = sections(&forward);
    let (chrom, counts) = &fwd[0];
    assert_eq!(chrom, "1");
    // 1-based line 115 of the section is position 114
    assert_eq!(counts[114], 1);
    assert_eq!(counts.iter().sum::<u64>(), 1);

    let reverse = fs::read_to_string(dir.path().join("out_r.wig"))?;
    assert!(reverse.starts_with("track type=wiggle_0 name=reverse\n"));
    let rev = sections(&reverse);
    assert!(rev.iter().all(|(_, c)| c.iter().all(|&v| v == 0)));
    Ok(())
}

#[test]
fn test_zero_fill_and_header_order() -> Result<()> {
    let dir = TempDir::new()?;
    let body = [
        sam_line("r1", 0, "Chr1", 101, "30M"),
        sam_line("r2", 16, "Chr1", 171, "30M"),
        sam_line("u1", 4, "*", 0, "*"),
    ]
    .concat();
    let sam = write_sam(dir.path(), &body);
    let prefix = dir.path().join("out");

    let output = run_extractor(&sam, &prefix, &[]);
    assert!(output.status.success());

    for suffix in ["_f.wig", "_r.wig"] {
        let text = fs::read_to_string(dir.path().join(format!("out{suffix}")))?;
        let parsed = sections(&text);
        let layout: Vec<(&str, usize)> = parsed.iter().map(|(c, v)| (c.as_str(), v.len())).collect();
        assert_eq!(layout, vec![("1", 500), ("2", 300), ("C", 120)]);
    }

    let rev = sections(&fs::read_to_string(dir.path().join("out_r.wig"))?);
    // Reverse read covering [170, 200): P-site 200 - 1 - 14
    assert_eq!(rev[0].1[185], 1);
    assert_eq!(rev[0].1.iter().sum::<u64>(), 1);
    Ok(())
}

#[test]
fn test_custom_offset_and_raw_names() -> Result<()> {
    let dir = TempDir::new()?;
    let sam = write_sam(dir.path(), &sam_line("r1", 0, "Chr2", 11, "28M"));
    let prefix = dir.path().join("raw");

    let output = run_extractor(&sam, &prefix, &["-p", "12", "--raw-names"]);
    assert!(output.status.success());

    let fwd = sections(&fs::read_to_string(dir.path().join("raw_f.wig"))?);
    assert_eq!(fwd[1].0, "Chr2");
    assert_eq!(fwd[1].1[22], 1);
    Ok(())
}

#[test]
fn test_extraction_is_idempotent() -> Result<()> {
    let dir = TempDir::new()?;
    let body = [
        sam_line("a", 0, "Chr1", 50, "30M"),
        sam_line("b", 16, "Chr2", 60, "29M"),
        sam_line("c", 0, "ChrC", 1, "30M"),
        sam_line("d", 0, "ChrC", 1, "30M"),
    ]
    .concat();
    let sam = write_sam(dir.path(), &body);

    assert!(run_extractor(&sam, &dir.path().join("one"), &[]).status.success());
    assert!(run_extractor(&sam, &dir.path().join("two"), &[]).status.success());

    for suffix in ["_f.wig", "_r.wig"] {
        let a = fs::read(dir.path().join(format!("one{suffix}")))?;
        let b = fs::read(dir.path().join(format!("two{suffix}")))?;
        assert_eq!(a, b, "{suffix} differs between runs");
    }
    Ok(())
}

#[test]
fn test_out_of_range_p_site_fails_without_output() -> Result<()> {
    let dir = TempDir::new()?;
    // Forward read starting at the last bases of ChrC: P-site beyond its end
    let sam = write_sam(dir.path(), &sam_line("edge", 0, "ChrC", 115, "6M"));
    let prefix = dir.path().join("bad");

    let output = run_extractor(&sam, &prefix, &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Offset/geometry mismatch") && stderr.contains("edge"),
        "got: {stderr}"
    );
    assert!(!dir.path().join("bad_f.wig").exists());
    assert!(!dir.path().join("bad_r.wig").exists());
    Ok(())
}

#[test]
fn test_missing_input_fails() -> Result<()> {
    let dir = TempDir::new()?;
    let output = run_extractor(&dir.path().join("absent.bam"), &dir.path().join("x"), &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.bam"), "got: {stderr}");
    Ok(())
}

#[test]
fn test_missing_required_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_ribotrack"))
        .arg("-i")
        .arg("reads.bam")
        .output()
        .expect("failed to run ribotrack");
    assert!(!output.status.success());
}
