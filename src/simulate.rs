//! Monte Carlo calibration of the fixed-horizon z-test
//!
//! Simulates many experiments at known true rates to check the empirical
//! false-positive rate and power of the significance engine against the
//! analytic values.

use std::io::{self, Write};

use rand::rngs::StdRng;
use rand::Rng;
use rand::RngCore;
use rand::SeedableRng;

use crate::calc_core::{evaluate, get_input, get_input_u64, get_optional_input, z_test_power, Variant};

pub fn run() {
    println!("\n==========================================");
    println!("   Z-TEST CALIBRATION SIMULATION");
    println!("==========================================\n");

    let p_ctrl = get_input("Control conversion rate % (e.g. 5): ") / 100.0;
    let p_trt = get_input("Treatment conversion rate % (e.g. 6): ") / 100.0;
    let n_per_variant = get_input_u64("Visitors per variant (e.g. 5000): ");
    let n_sims = get_input_u64("Number of simulations (e.g. 2000): ") as usize;
    let seed = get_optional_input("Seed for reproducibility (press Enter for random): ");

    println!("\n--- Simulation Design ---");
    println!("Control rate:    {:.2}%", p_ctrl * 100.0);
    println!("Treatment rate:  {:.2}%", p_trt * 100.0);
    println!("N per variant:   {}", n_per_variant);
    println!("Simulations:     {}", n_sims);
    if let Some(s) = seed {
        println!("Seed:            {}", s);
    } else {
        println!("Seed:            random");
    }

    let mut rng: Box<dyn RngCore> = match seed {
        Some(s) => Box::new(StdRng::seed_from_u64(s)),
        None => Box::new(rand::thread_rng()),
    };

    // === PHASE 1: FALSE POSITIVES (both arms at the control rate) ===
    print!("\nPhase 1: False positive rate (null)");
    io::stdout().flush().unwrap();
    let type1 = rejection_rate(&mut *rng, p_ctrl, p_ctrl, n_per_variant, n_sims, true);
    println!(" Done.");

    // === PHASE 2: POWER (true lift present) ===
    print!("Phase 2: Power");
    io::stdout().flush().unwrap();
    let power = rejection_rate(&mut *rng, p_ctrl, p_trt, n_per_variant, n_sims, true);
    println!(" Done.");

    let analytic = z_test_power(p_ctrl, p_trt, n_per_variant);

    println!("\n==========================================");
    println!("   RESULTS");
    println!("==========================================");
    println!("False positive rate:  {:.2}%  (nominal 5%)", type1 * 100.0);
    println!("Empirical power:      {:.1}%", power * 100.0);
    println!("Analytic power:       {:.1}%", analytic * 100.0);
    println!("Gap:                  {:+.1}%", (power - analytic) * 100.0);
    println!("==========================================");
}

/// Fraction of simulated experiments the engine flags significant
fn rejection_rate<R: Rng + ?Sized>(
    rng: &mut R,
    p_ctrl: f64,
    p_trt: f64,
    n_per_variant: u64,
    n_sims: usize,
    progress: bool,
) -> f64 {
    let pb_interval = (n_sims / 20).max(1);
    let mut rejections = 0usize;

    for sim in 0..n_sims {
        if progress && sim % pb_interval == 0 {
            print!(".");
            io::stdout().flush().unwrap();
        }

        let control = Variant::new("A", n_per_variant, draw_conversions(&mut *rng, p_ctrl, n_per_variant));
        let treatment = Variant::new("B", n_per_variant, draw_conversions(&mut *rng, p_trt, n_per_variant));

        // Counts are valid by construction, so evaluate cannot fail here
        let results = evaluate(&control, &[treatment]).unwrap();
        if results[0].is_significant {
            rejections += 1;
        }
    }

    rejections as f64 / n_sims as f64
}

fn draw_conversions<R: Rng + ?Sized>(rng: &mut R, rate: f64, visitors: u64) -> u64 {
    let mut conversions = 0u64;
    for _ in 0..visitors {
        if rng.gen_bool(rate) {
            conversions += 1;
        }
    }
    conversions
}
