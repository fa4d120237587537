use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;

use addr_recon::{
    load_submissions, load_system_rows, write_outputs, MatchConfig, ReconciliationEngine,
    RecordIndex, SubmissionSchema,
};

struct Args {
    forms_path: PathBuf,
    system_path: PathBuf,
    out_dir: PathBuf,
    threshold: Option<f64>,
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = match parse_args() {
        Some(args) => args,
        None => {
            eprintln!(
                "Usage: addr-recon <forms.csv> <system.csv> [--out DIR] [--threshold T] [--json]"
            );
            std::process::exit(2);
        }
    };

    println!("🏠 Address Reconciliation v{}", addr_recon::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load inputs
    println!("\n📂 Loading submissions...");
    let submissions = load_submissions(&args.forms_path)?;
    println!("✓ Loaded {} submission(s)", submissions.len());

    println!("\n📂 Loading system-of-record export...");
    let system_rows = load_system_rows(&args.system_path)?;
    println!("✓ Loaded {} system row(s)", system_rows.len());

    // 2. Build index
    let index = RecordIndex::build(&system_rows);
    println!("✓ Indexed {} account(s)", index.account_count());

    // 3. Reconcile
    println!("\n⚖️  Reconciling...");
    let config = match args.threshold {
        Some(threshold) => MatchConfig {
            char_ratio_threshold: threshold,
            token_overlap_threshold: threshold,
            ..MatchConfig::default()
        },
        None => MatchConfig::default(),
    };
    let engine = ReconciliationEngine::with_config(config);
    let report = engine.reconcile(&submissions, &SubmissionSchema::default(), &index)?;

    // 4. Write outputs
    println!("\n💾 Writing output tables to {}...", args.out_dir.display());
    write_outputs(&args.out_dir, &report)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✅ Matched: {} | ❌ Unmatched: {}",
        report.matched_count(),
        report.unmatched_count()
    );
    println!("{}", report.summary());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.run_summary())?);
    }

    Ok(())
}

fn parse_args() -> Option<Args> {
    let mut positional = Vec::new();
    let mut out_dir = PathBuf::from("output");
    let mut threshold = None;
    let mut json = false;

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" => out_dir = PathBuf::from(iter.next()?),
            "--threshold" => {
                let raw = iter.next()?;
                match parse_threshold(&raw) {
                    Ok(t) => threshold = Some(t),
                    Err(e) => {
                        eprintln!("❌ {}", e);
                        return None;
                    }
                }
            }
            "--json" => json = true,
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    if positional.len() != 2 {
        return None;
    }
    let system_path = positional.pop()?;
    let forms_path = positional.pop()?;

    Some(Args {
        forms_path,
        system_path,
        out_dir,
        threshold,
        json,
    })
}

fn parse_threshold(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid threshold {:?}", raw))?;
    if !(0.0..=1.0).contains(&value) {
        bail!("threshold must be between 0.0 and 1.0, got {}", value);
    }
    Ok(value)
}
