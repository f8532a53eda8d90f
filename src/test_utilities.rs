//! Test cases and test utility functions.
//!

use std::io::Write;
use std::path::PathBuf;

use rand::{thread_rng, Rng};
use tempfile::{Builder, NamedTempFile};

use crate::{attributes::Attributes, items::Feature, items::Strand, Position};

// Stochastic test annotation defaults
//
// number of genes in a random annotation
pub const NRANDOM_GENES: usize = 1000;

// transcripts per gene, exons per transcript
pub const MAX_TRANSCRIPTS: usize = 3;
pub const MAX_EXONS: usize = 6;

// exon length
pub const MIN_LEN: Position = 50;
pub const MAX_LEN: Position = 2000;

// number of chromosome sequences
pub const NCHROM: usize = 22;

/// Get the path to the `gtfio` binary built alongside the running test.
pub fn gtfio_binary_path() -> PathBuf {
    let mut path = std::env::current_exe().expect("could not find the test executable");
    // target/<profile>/deps/<test> -> target/<profile>/gtfio
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.join(format!("gtfio{}", std::env::consts::EXE_SUFFIX))
}

/// Sample a random chromosome
pub fn random_chrom() -> String {
    let mut rng = thread_rng();
    format!("chr{}", rng.gen_range(1..NCHROM + 1))
}

fn feature(
    seq_name: &str,
    feature_type: &str,
    start: Position,
    end: Position,
    strand: Strand,
    attributes: &[(&str, &str)],
) -> Feature {
    let mut map = Attributes::new();
    for (key, value) in attributes {
        map.insert(key.to_string(), vec![value.to_string()]);
    }
    Feature {
        seq_name: Some(seq_name.to_string()),
        source: Some("random".to_string()),
        feature_type: Some(feature_type.to_string()),
        start: Some(start),
        end: Some(end),
        score: None,
        strand: Some(strand),
        frame: None,
        attributes: map,
        child_features: Vec::new(),
        derived_features: Vec::new(),
    }
}

/// Build a random gene tree: a `gene` with one or more `transcript`
/// children, each with one or more `exon` children.
pub fn random_gene(gene_id: &str) -> Feature {
    let mut rng = thread_rng();
    let chrom = random_chrom();
    let strand = if rng.gen_bool(0.5) {
        Strand::Forward
    } else {
        Strand::Reverse
    };
    let gene_start: Position = rng.gen_range(1..1_000_000);

    let mut gene = feature(
        &chrom,
        "gene",
        gene_start,
        gene_start,
        strand.clone(),
        &[("gene_id", gene_id)],
    );
    for t in 0..rng.gen_range(1..=MAX_TRANSCRIPTS) {
        let transcript_id = format!("{}.{}", gene_id, t + 1);
        let ids = [("gene_id", gene_id), ("transcript_id", transcript_id.as_str())];
        let mut transcript = feature(
            &chrom,
            "transcript",
            gene_start,
            gene_start,
            strand.clone(),
            &ids,
        );
        let mut position = gene_start;
        for e in 0..rng.gen_range(1..=MAX_EXONS) {
            let start = position + rng.gen_range(1..MAX_LEN);
            let end = start + rng.gen_range(MIN_LEN..MAX_LEN);
            let exon_number = (e + 1).to_string();
            let mut exon_ids = ids.to_vec();
            exon_ids.push(("exon_number", exon_number.as_str()));
            transcript
                .child_features
                .push(feature(&chrom, "exon", start, end, strand.clone(), &exon_ids));
            position = end;
        }
        transcript.end = Some(position);
        gene.end = gene.end.max(Some(position));
        gene.child_features.push(transcript);
    }
    gene
}

/// Random gene trees with ids `G1`, `G2`, ...
pub fn random_genes(n: usize) -> Vec<Feature> {
    (1..=n).map(|i| random_gene(&format!("G{}", i))).collect()
}

/// Create a temporary file with a `.gtf` suffix.
pub fn temp_gtffile() -> NamedTempFile {
    Builder::new()
        .suffix(".gtf")
        .tempfile()
        .expect("Failed to create temp file")
}

/// Write `n` random genes to a temporary GTF file, with a `###` sync mark
/// after each gene.
pub fn random_gtffile(n: usize) -> NamedTempFile {
    let mut file = temp_gtffile();
    for gene in random_genes(n) {
        let text = crate::format::format_feature(&gene).expect("random genes are shallow");
        file.write_all(text.as_bytes())
            .expect("could not write random GTF");
        file.write_all(b"###\n").expect("could not write random GTF");
    }
    file.flush().expect("could not write random GTF");
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_gene_shape() {
        let gene = random_gene("G1");
        assert!(gene.is_type("gene"));
        assert!(!gene.child_features.is_empty());
        for transcript in &gene.child_features {
            assert!(transcript.is_type("transcript"));
            assert!(transcript.attribute("transcript_id").unwrap().starts_with("G1."));
            assert!(transcript.end <= gene.end);
        }
    }
}
