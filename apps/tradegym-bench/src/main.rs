use clap::Parser;
use std::path::PathBuf;
use tradegym::obs;

#[derive(Parser)]
#[command(name = "tradegym-bench")]
#[command(about = "Synthetic benchmark tool for Tradegym (dev)")]
struct Args {
    /// Number of environment steps to run (default: 1_000_000).
    #[arg(long, default_value_t = 1_000_000)]
    steps: usize,

    /// Built-in policy: hold, buy_and_hold or sma.
    #[arg(long, default_value = "sma")]
    policy: String,

    /// Starting cash balance.
    #[arg(long, default_value_t = 10_000.0)]
    initial_balance: f64,

    /// Print a single JSON line instead of human output.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Prometheus metrics listen addr (e.g. 127.0.0.1:9898). Optional.
    #[arg(long)]
    metrics_addr: Option<String>,

    /// Write a CPU profile as an SVG flamegraph to this path (requires feature `pprof`).
    #[arg(long)]
    profile_svg: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    if let Err(err) = obs::init_tracing("info", "text") {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(args.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    if let Err(err) = run_bench(&args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_bench(args: &Args) -> Result<(), String> {
    let policy_label = args.policy.trim().to_lowercase();

    #[cfg(feature = "pprof")]
    let guard = if let Some(path) = &args.profile_svg {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
        }
        Some(
            pprof::ProfilerGuard::new(100)
                .map_err(|err| format!("failed to start profiler: {err}"))?,
        )
    } else {
        None
    };

    #[cfg(not(feature = "pprof"))]
    if args.profile_svg.is_some() {
        return Err("profiling requires tradegym-bench feature `pprof`".to_string());
    }

    let bench = tradegym_application::benchmarking::run_bench(
        args.steps,
        &policy_label,
        args.initial_balance,
    )?;

    metrics::histogram!("tradegym.bench.elapsed_ms", "policy" => bench.policy.clone())
        .record(bench.elapsed_ms as f64);
    metrics::gauge!("tradegym.bench.steps_per_sec", "policy" => bench.policy.clone())
        .set(bench.steps_per_sec);
    metrics::gauge!("tradegym.bench.steps_processed", "policy" => bench.policy.clone())
        .set(bench.steps_processed as f64);

    #[cfg(feature = "pprof")]
    if let (Some(guard), Some(path)) = (guard, &args.profile_svg) {
        let report = guard
            .report()
            .build()
            .map_err(|err| format!("failed to build profile report: {err}"))?;
        let file = std::fs::File::create(path)
            .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
        report
            .flamegraph(file)
            .map_err(|err| format!("failed to write flamegraph: {err}"))?;
        tracing::info!(profile_svg = %path.display(), "wrote cpu profile flamegraph");
    }

    let summary = &bench.result.summary;
    let stats = &bench.result.stats;
    if args.json {
        let line = serde_json::json!({
            "policy": bench.policy,
            "steps_requested": bench.steps_requested,
            "steps_processed": bench.steps_processed,
            "elapsed_ms": bench.elapsed_ms,
            "steps_per_sec": bench.steps_per_sec,
            "buys": stats.buys,
            "sells": stats.sells,
            "rejected_orders": stats.rejected_orders,
            "profit": summary.profit,
        });
        println!("{}", line);
    } else {
        println!(
            "bench: policy={} steps={} elapsed_ms={} steps_per_sec={:.2}",
            bench.policy, bench.steps_processed, bench.elapsed_ms, bench.steps_per_sec
        );
        println!(
            "bench: buys={} sells={} rejected={} final_balance={:.4} profit_percent={:.4}",
            stats.buys,
            stats.sells,
            stats.rejected_orders,
            summary.final_balance,
            summary.profit_percent
        );
    }

    Ok(())
}
