use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "msqueue workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the queue benchmarks and write a comparison report
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
}

const BENCH: &str = "queue_benchmark";
const BASELINE: &str = "current";
/// Implementations in report column order; the last one is the reference.
const QUEUES: &[&str] = &["ms_queue", "mutex_vec_deque"];

/// workload -> queue -> elements per second
type Results = BTreeMap<String, BTreeMap<String, f64>>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!(">>> Running {BENCH}...");
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.args(["bench", "--bench", BENCH, "--"]);
    cmd.arg("--save-baseline").arg(BASELINE);
    if quick {
        cmd.arg("--measurement-time").arg("0.5");
        cmd.arg("--noplot");
        cmd.arg("--sample-size").arg("10");
    }

    let status = cmd
        .status()
        .with_context(|| format!("failed to run cargo bench for {BENCH}"))?;
    if !status.success() {
        anyhow::bail!("benchmark {BENCH} failed");
    }
    println!("Finished in {:.2?}", start.elapsed());
    Ok(())
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");
    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    let mut results = Results::new();
    collect_results(criterion_dir, &mut results)?;

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(report_path, render_report(&results)?)
        .with_context(|| format!("failed to write {}", report_path.display()))?;

    println!("Report written to {}", report_path.display());
    Ok(())
}

fn render_report(results: &Results) -> Result<String, fmt::Error> {
    let reference = QUEUES[QUEUES.len() - 1];
    let mut out = String::new();
    writeln!(out, "# Queue Benchmark Report\n")?;

    write!(out, "| Workload |")?;
    for queue in QUEUES {
        write!(out, " {queue} (elems/s) |")?;
    }
    writeln!(out, " vs {reference} |")?;

    write!(out, "|---|")?;
    for _ in QUEUES {
        write!(out, "---|")?;
    }
    writeln!(out, "---|")?;

    for (workload, by_queue) in results {
        write!(out, "| {workload} |")?;
        for queue in QUEUES {
            match by_queue.get(*queue) {
                Some(rate) => write!(out, " {} |", format_rate(*rate))?,
                None => write!(out, " N/A |")?,
            }
        }
        match (by_queue.get(QUEUES[0]), by_queue.get(reference)) {
            (Some(ours), Some(theirs)) if *theirs > 0.0 => {
                writeln!(out, " **{:.2}x** |", ours / theirs)?;
            }
            _ => writeln!(out, " - |")?,
        }
    }
    Ok(out)
}

fn format_rate(rate: f64) -> String {
    if rate > 1_000_000.0 {
        format!("{:.2}M", rate / 1_000_000.0)
    } else if rate > 1_000.0 {
        format!("{:.2}K", rate / 1_000.0)
    } else {
        format!("{rate:.0}")
    }
}

/// Walks criterion's output tree looking for
/// `<group>/<queue>[/<param>]/<BASELINE>/estimates.json`.
fn collect_results(dir: &Path, results: &mut Results) -> Result<()> {
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_results(&path, results)?;
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) != Some("estimates.json") {
            continue;
        }
        let Some(baseline_dir) = path.parent() else {
            continue;
        };
        if baseline_dir.file_name().and_then(|s| s.to_str()) != Some(BASELINE) {
            continue;
        }
        let Some(bench_dir) = baseline_dir.parent() else {
            continue;
        };
        let Some((workload, queue)) = workload_and_queue(bench_dir) else {
            continue;
        };

        let estimates: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)
            .with_context(|| format!("malformed {}", path.display()))?;
        let Some(time_ns) = estimates
            .get("mean")
            .and_then(|m| m.get("point_estimate"))
            .and_then(serde_json::Value::as_f64)
        else {
            continue;
        };
        if time_ns <= 0.0 {
            continue;
        }

        let elements = throughput_elements(&baseline_dir.join("benchmark.json")).unwrap_or(1.0);
        results
            .entry(workload)
            .or_default()
            .insert(queue, elements * 1e9 / time_ns);
    }
    Ok(())
}

/// Splits a bench directory into a workload label and the queue name.
fn workload_and_queue(bench_dir: &Path) -> Option<(String, String)> {
    let name = |p: &Path| p.file_name().and_then(|s| s.to_str()).map(str::to_owned);

    let leaf = name(bench_dir)?;
    if QUEUES.contains(&leaf.as_str()) {
        // `<group>/<queue>`
        let group = name(bench_dir.parent()?)?;
        return Some((group, leaf));
    }
    // `<group>/<queue>/<param>`
    let queue_dir = bench_dir.parent()?;
    let queue = name(queue_dir)?;
    if !QUEUES.contains(&queue.as_str()) {
        return None;
    }
    let group = name(queue_dir.parent()?)?;
    Some((format!("{group}/{leaf}"), queue))
}

fn throughput_elements(benchmark_json: &Path) -> Option<f64> {
    let content = fs::read_to_string(benchmark_json).ok()?;
    let json: serde_json::Value = serde_json::from_str(&content).ok()?;
    json.get("throughput")?.get("Elements")?.as_f64()
}
