use clap::Parser;
use bbls::annotate::annotate;
use bbls::error::BblsResult;
use bbls::io::{load_tree_and_scores, write_report};
use bbls::score::compute_scores;
use std::time::Instant;

/// Compute the Bayesian Branch Length Score (BBLS) of a sequence motif
/// over a rooted phylogenetic tree, together with the all-ones Branch
/// Length Score (BLS) used to normalize it.
#[derive(Parser, Debug)]
#[command(name = "bbls", version, about = "Bayesian branch length score for motif conservation")]
struct Args {
    /// Newick tree with branch lengths; `-` reads standard input
    #[arg(short = 't', long = "tree", default_value = "-")]
    tree: String,

    /// `<leaf-id> <score>` lines; `-` reads standard input. When tree and
    /// scores share one source the tree is its first line
    #[arg(short = 's', long = "scores", default_value = "-")]
    scores: String,

    /// Destination for the report; `-` writes to standard output
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: String,

    /// Accepted for compatibility with older pipelines; has no effect
    #[arg(short = 'l', long = "length")]
    length: Option<u32>,

    /// Verbosity level: 1 prints stage timings, 2 also dumps the annotated
    /// tree state; bare -v means 1
    #[arg(
        short = 'v',
        long = "verbose",
        value_name = "LEVEL",
        num_args = 0..=1,
        default_value_t = 0,
        default_missing_value = "1"
    )]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run(args: &Args) -> BblsResult<()> {
    let verbose = args.verbose;
    if args.length.is_some() {
        log_if(verbose >= 1, "Ignoring -l/--length (unused)".to_string());
    }

    let t0 = Instant::now();
    let (tree, scores) = load_tree_and_scores(&args.tree, &args.scores)?;
    let read_s = t0.elapsed().as_secs_f64();
    log_if(verbose >= 1, format!("Reading inputs {read_s:.3}s"));
    log_if(
        verbose >= 1,
        format!("Read {} leaves and {} scores", tree.num_leaves(), scores.len()),
    );

    let t1 = Instant::now();
    let (bbls, bls) = compute_scores(&tree, &scores)?;
    let compute_s = t1.elapsed().as_secs_f64();
    log_if(verbose >= 1, format!("Scoring {compute_s:.3}s"));

    if verbose >= 2 {
        // Redo the observed annotation on a scratch copy to show its state.
        let mut annotated = tree.unannotated_copy();
        annotate(&mut annotated, &scores)?;
        eprint!("{}", annotated.state_table());
    }

    let t2 = Instant::now();
    write_report(&args.output, bbls, bls)?;
    let write_s = t2.elapsed().as_secs_f64();
    log_write_done(verbose >= 1, &args.output, write_s);
    Ok(())
}

fn log_if(show: bool, msg: String) {
    // Progress goes to stderr so `-o -` keeps stdout to the report alone.
    if show {
        eprintln!("{msg}");
    }
}

fn log_write_done(show: bool, output: &str, secs: f64) {
    if !show {
        return;
    }
    if output == "-" {
        eprintln!("Writing to stdout {secs:.3}s");
    } else {
        eprintln!("Writing to output {secs:.3}s");
    }
}
