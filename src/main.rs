mod calc_core;
mod significance;
mod plan;
mod simulate;

use std::env;

use analyze_test::AnalyzeOptions;
use calc_core::SampleSizeParams;

fn main() {
    let args: Vec<String> = env::args().collect();

    // If arguments provided, use CLI mode
    if args.len() > 1 {
        run_cli(&args[1..]);
        return;
    }

    // Otherwise, interactive menu
    run_interactive();
}

fn run_cli(args: &[String]) {
    if args.is_empty() {
        print_usage();
        return;
    }

    match args[0].as_str() {
        "analyze" | "a" => {
            if args.len() < 2 {
                eprintln!("Error: CSV file required");
                eprintln!("Usage: abcalc analyze <file.csv> [options]");
                return;
            }
            let csv_path = &args[1];
            let opts = parse_analyze_options(&args[2..]);

            if let Err(e) = analyze_test::run_cli(csv_path, &opts) {
                eprintln!("Error: {}", e);
            }
        }
        "plan" | "p" => {
            let (params, variants) = parse_plan_options(&args[1..]);
            if let Err(e) = plan::print_plan(&params, variants) {
                eprintln!("Error: {}", e);
            }
        }
        "help" | "-h" | "--help" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", args[0]);
            print_usage();
        }
    }
}

fn parse_analyze_options(args: &[String]) -> AnalyzeOptions {
    let mut opts = AnalyzeOptions::default();
    for arg in args {
        match arg.as_str() {
            "--json" | "-j" => opts.json = true,
            "--no-report" => opts.generate_report = false,
            _ => {}
        }
    }
    opts
}

fn parse_plan_options(args: &[String]) -> (SampleSizeParams, u64) {
    // Defaults mirror the reference calculator
    let mut params = SampleSizeParams {
        baseline_conversion: 5.0,
        minimum_detectable_effect: 20.0,
        confidence_level: 95,
        statistical_power: 80,
    };
    let mut variants: u64 = 2;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--baseline" | "-b" => {
                if i + 1 < args.len() {
                    if let Ok(v) = args[i + 1].parse() {
                        params.baseline_conversion = v;
                    }
                    i += 1;
                }
            }
            "--mde" | "-m" => {
                if i + 1 < args.len() {
                    if let Ok(v) = args[i + 1].parse() {
                        params.minimum_detectable_effect = v;
                    }
                    i += 1;
                }
            }
            "--confidence" | "-c" => {
                if i + 1 < args.len() {
                    if let Ok(v) = args[i + 1].parse() {
                        params.confidence_level = v;
                    }
                    i += 1;
                }
            }
            "--power" | "-p" => {
                if i + 1 < args.len() {
                    if let Ok(v) = args[i + 1].parse() {
                        params.statistical_power = v;
                    }
                    i += 1;
                }
            }
            "--variants" | "-v" => {
                if i + 1 < args.len() {
                    if let Ok(v) = args[i + 1].parse() {
                        variants = v;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    (params, variants.max(2))
}

fn print_usage() {
    println!("abcalc: A/B Test Significance & Sample Size Calculator");
    println!();
    println!("USAGE:");
    println!("  abcalc                        Interactive mode");
    println!("  abcalc analyze <file.csv>     Evaluate recorded test data");
    println!("  abcalc plan [options]         Compute required sample size");
    println!();
    println!("ANALYZE OPTIONS:");
    println!("  -j, --json              Also write results as JSON");
    println!("  --no-report             Skip HTML report generation");
    println!();
    println!("PLAN OPTIONS:");
    println!("  -b, --baseline <pct>    Baseline conversion rate % (default: 5)");
    println!("  -m, --mde <pct>         Minimum detectable effect %, relative (default: 20)");
    println!("  -c, --confidence <lvl>  Confidence level: 90, 95 or 99 (default: 95)");
    println!("  -p, --power <lvl>       Statistical power: 80, 90, 95 or 99 (default: 80)");
    println!("  -v, --variants <n>      Number of variants incl. control (default: 2)");
    println!();
    println!("CSV FORMAT:");
    println!("  variant,visitors,conversions   (first row is the control)");
    println!();
    println!("EXAMPLES:");
    println!("  abcalc analyze checkout_test.csv --json");
    println!("  abcalc plan -b 5 -m 20 -c 95 -p 80 -v 3");
}

fn run_interactive() {
    println!("\n==========================================");
    println!("   A/B Test Calculator");
    println!("==========================================");
    println!("\nSelect an option:");
    println!("  1. Significance test (enter counts)");
    println!("  2. Sample size calculator");
    println!("  3. Analyze test data (CSV)");
    println!("  4. Z-test calibration simulation");
    println!("  0. Exit");

    print!("\nSelect: ");
    std::io::Write::flush(&mut std::io::stdout()).unwrap();

    let mut input = String::new();
    std::io::stdin().read_line(&mut input).unwrap();

    match input.trim() {
        "1" => significance::run(),
        "2" => plan::run(),
        "3" => {
            if let Err(e) = analyze_test::run() {
                eprintln!("Error: {}", e);
            }
        }
        "4" => simulate::run(),
        "0" => println!("Goodbye!"),
        _ => println!("Invalid option"),
    }
}
