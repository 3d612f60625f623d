//! Sample size planner for an upcoming A/B/n test

use crate::calc_core::{
    get_choice, get_input, get_input_u64, required_sample_size, z_test_power, SampleSizeParams,
};

pub fn run() {
    println!("\n==========================================");
    println!("   SAMPLE SIZE CALCULATOR");
    println!("==========================================\n");

    let baseline = get_input("Baseline conversion rate % (e.g. 5): ");
    let mde = get_input("Minimum detectable effect % relative to baseline (e.g. 20): ");

    let confidence = match get_choice("\nConfidence level:", &["90%", "95%", "99%"]) {
        1 => 90,
        2 => 95,
        _ => 99,
    };
    let power = match get_choice("\nStatistical power:", &["80%", "90%", "95%", "99%"]) {
        1 => 80,
        2 => 90,
        3 => 95,
        _ => 99,
    };

    let variant_count = get_input_u64("\nNumber of variants including control (e.g. 2): ").max(2);

    let params = SampleSizeParams {
        baseline_conversion: baseline,
        minimum_detectable_effect: mde,
        confidence_level: confidence,
        statistical_power: power,
    };

    if let Err(e) = print_plan(&params, variant_count) {
        eprintln!("Error: {}", e);
    }
}

/// Compute and print the plan; shared between interactive and CLI modes
pub fn print_plan(
    params: &SampleSizeParams,
    variant_count: u64,
) -> Result<(), crate::calc_core::StatError> {
    let n = required_sample_size(params)?;

    let p1 = params.baseline_conversion / 100.0;
    let p2 = p1 * (1.0 + params.minimum_detectable_effect / 100.0);
    let achieved = z_test_power(p1, p2, n);

    println!("\n--- Test Design ---");
    println!("Baseline rate:       {:.2}%", params.baseline_conversion);
    println!(
        "Target rate:         {:.2}% ({:+.0}% relative)",
        p2 * 100.0,
        params.minimum_detectable_effect
    );
    println!("Confidence:          {}%", params.confidence_level);
    println!("Power:               {}%", params.statistical_power);
    println!("Variants:            {}", variant_count);

    println!("\n--- Required Sample ---");
    println!("Per variant:         {} visitors", n);
    println!("Total:               {} visitors", n * variant_count);
    println!(
        "Power check at N:    {:.1}% (analytic, 95% two-sided test)",
        achieved * 100.0
    );

    Ok(())
}
