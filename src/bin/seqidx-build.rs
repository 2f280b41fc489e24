use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use seqidx::{Alphabet, BuildConfig, Sequence, build_exact, compute_kmer_size};

/// Build a k-mer index from a sequence file and report its statistics.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input file, one sequence of residue letters per line
    #[arg(short, long)]
    input: PathBuf,

    /// Alphabet: dna | amino
    #[arg(long, default_value = "amino")]
    alphabet: String,

    /// K-mer length (derived from the database size when omitted)
    #[arg(short = 'k', long)]
    kmer_size: Option<usize>,

    /// Fill worker windows (0 = one per thread)
    #[arg(long, default_value_t = 0)]
    windows: usize,

    /// Write the offset buffer here
    #[arg(long)]
    offsets_out: Option<PathBuf>,

    /// Write the entry buffer here
    #[arg(long)]
    entries_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let alphabet = match args.alphabet.as_str() {
        "dna" => Alphabet::dna(),
        "amino" => Alphabet::amino(),
        other => bail!("unknown alphabet {other:?}, expected dna or amino"),
    };

    let reader = BufReader::new(
        File::open(&args.input).with_context(|| format!("open {}", args.input.display()))?,
    );
    let mut sequences = Vec::new();
    let mut residues = 0u64;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let symbols = alphabet
            .encode(line.as_bytes())
            .with_context(|| format!("line {}", lineno + 1))?;
        residues += symbols.len() as u64;
        sequences.push(Sequence::new(sequences.len() as u32, symbols)?);
    }
    if sequences.is_empty() {
        bail!("no sequences in {}", args.input.display());
    }

    let k = args.kmer_size.unwrap_or_else(|| compute_kmer_size(residues));
    log::info!(
        "indexing {} sequences ({} residues) with k = {}",
        sequences.len(),
        residues,
        k
    );

    let cfg = BuildConfig::default().windows(args.windows);
    let table = build_exact(&sequences, alphabet.size(), k, &cfg)?;
    seqidx::report(&table, &alphabet);

    if let (Some(offsets_out), Some(entries_out)) = (&args.offsets_out, &args.entries_out) {
        seqidx::io::write_buffers(&table, offsets_out, entries_out)?;
        log::info!(
            "wrote {} and {}",
            offsets_out.display(),
            entries_out.display()
        );
    }

    Ok(())
}
