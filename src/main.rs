use cogbench::{AccessMode, BenchmarkReport, Locator, StrategyRunner};
use std::process::ExitCode;

const USAGE: &str = "\
cogbench - compare access strategies for remote Cloud-Optimized GeoTIFFs

USAGE:
    cogbench <locator> [mode...]

ARGS:
    <locator>   http(s):// URL, s3://bucket/key, or a local file path
    [mode...]   local-download | remote-default | remote-tuned | remote-chunked
                (all four when omitted)
";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    let Some((target, mode_args)) = args.split_first() else {
        eprint!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let locator: Locator = match target.parse() {
        Ok(locator) => locator,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let modes: Vec<AccessMode> = if mode_args.is_empty() {
        AccessMode::ALL.to_vec()
    } else {
        match mode_args.iter().map(|arg| arg.parse()).collect::<Result<_, _>>() {
            Ok(modes) => modes,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    };

    let mut runner = StrategyRunner::new();
    let mut failures = 0;
    for mode in modes {
        println!("== {mode} ==");
        for option in cogbench::resolve(mode) {
            println!("  {option}");
        }
        match runner.run(&locator, mode) {
            Ok(outcome) => println!(
                "  mean {:.4} over {} pixels ({} requests, {} bytes)\n",
                outcome.mean, outcome.pixels, outcome.transfer.requests, outcome.transfer.bytes
            ),
            Err(e) => {
                eprintln!("  {mode} failed: {e}\n");
                failures += 1;
            }
        }
    }

    let report = BenchmarkReport::from_samples(runner.log());
    if !report.is_empty() {
        println!("{report}");
    }

    if failures > 0 {
        eprintln!("{failures} run(s) failed");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
