//! Interactive significance check for a running A/B/n experiment

use std::fs::File;
use std::io::Write;

use chrono::Utc;

use crate::calc_core::{
    evaluate, get_bool, get_input_u64, TestResult, Variant, Z_CRIT_95,
};

/// Maximum arms including control, matching the reference calculator
const MAX_VARIANTS: usize = 4;

pub fn run() {
    println!("\n==========================================");
    println!("   SIGNIFICANCE TEST");
    println!("==========================================\n");

    println!("Control (variant A):");
    let control = prompt_variant("A");

    let mut treatments: Vec<Variant> = Vec::new();
    loop {
        let id = ((b'B' + treatments.len() as u8) as char).to_string();
        println!("\nTreatment (variant {}):", id);
        treatments.push(prompt_variant(&id));

        if 1 + treatments.len() >= MAX_VARIANTS {
            break;
        }
        if !get_bool("Add another variant?") {
            break;
        }
    }

    let results = match evaluate(&control, &treatments) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    if results.is_empty() {
        println!("\nControl has no visitors yet - nothing to compare.");
        println!("Collect some traffic and run the test again.");
        return;
    }

    print_results(&control, &treatments, &results);

    if get_bool("\nGenerate HTML report?") {
        let html = build_html_report(&control, &treatments, &results);
        let report_path = "significance_report.html";
        match File::create(report_path).and_then(|mut f| f.write_all(html.as_bytes())) {
            Ok(_) => println!("\n>> Report saved: {}", report_path),
            Err(e) => eprintln!("Error writing report: {}", e),
        }
    }

    println!("\n==========================================");
}

/// Prompt for one arm's counts, enforcing conversions <= visitors
fn prompt_variant(id: &str) -> Variant {
    let visitors = get_input_u64("  Visitors: ");
    let conversions = loop {
        let c = get_input_u64("  Conversions: ");
        if c <= visitors {
            break c;
        }
        println!("  Conversions cannot exceed visitors ({}).", visitors);
    };
    Variant::new(id, visitors, conversions)
}

pub fn print_results(control: &Variant, treatments: &[Variant], results: &[TestResult]) {
    println!("\n==========================================");
    println!("   RESULTS");
    println!("==========================================");

    println!("\n--- Conversion Rates ---");
    println!(
        "  {} (control):   {:.2}%  ({}/{})",
        control.id,
        control.rate() * 100.0,
        control.conversions,
        control.visitors
    );
    for v in treatments {
        println!(
            "  {}:             {:.2}%  ({}/{})",
            v.id,
            v.rate() * 100.0,
            v.conversions,
            v.visitors
        );
    }

    println!("\n--- Comparison vs Control (95% CI) ---");
    for r in results {
        println!("\n  Variant {}:", r.variant_id);
        println!("    Difference:     {:+.2} pp ({:+.2} to {:+.2})",
            r.rate_difference, r.confidence_interval.0, r.confidence_interval.1);
        match r.relative_improvement {
            Some(lift) => println!("    Improvement:    {:+.1}%", lift),
            None => println!("    Improvement:    n/a (control rate is 0%)"),
        }
        println!("    Z-score:        {:.3}", r.z_score);
        println!("    P-value:        {:.4}", r.p_value);
        println!("    Verdict:        {}", verdict(r));
    }

    println!("\n--- Recommendation ---");
    match results.iter().find(|r| r.is_winner) {
        Some(w) => {
            let lift = w
                .relative_improvement
                .map(|l| format!(" ({:+.1}%)", l))
                .unwrap_or_default();
            println!("  Variant {} beats the control{}.", w.variant_id, lift);
        }
        None => {
            if results.iter().any(|r| r.is_loser) {
                println!("  No winner; at least one variant performs significantly worse.");
            } else {
                println!("  No significant difference yet - keep collecting data.");
            }
        }
    }
}

fn verdict(r: &TestResult) -> &'static str {
    if r.insufficient_data {
        "INSUFFICIENT DATA"
    } else if r.is_winner {
        "WINNER"
    } else if r.is_loser {
        "LOSER"
    } else if r.is_significant {
        "significant"
    } else {
        "not significant"
    }
}

pub fn build_html_report(
    control: &Variant,
    treatments: &[Variant],
    results: &[TestResult],
) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();

    // Bar chart of per-arm rates with 95% error bars
    let mut labels: Vec<String> = vec![format!("{} (control)", control.id)];
    let mut rates: Vec<f64> = vec![control.rate() * 100.0];
    let mut errors: Vec<f64> = vec![rate_margin(control)];
    for v in treatments {
        labels.push(v.id.clone());
        rates.push(v.rate() * 100.0);
        errors.push(rate_margin(v));
    }

    let labels_json = format!("{:?}", labels);
    let rates_json: Vec<String> = rates.iter().map(|r| format!("{:.4}", r)).collect();
    let errors_json: Vec<String> = errors.iter().map(|e| format!("{:.4}", e)).collect();

    let mut rows = String::new();
    for r in results {
        let lift = r
            .relative_improvement
            .map(|l| format!("{:+.1}%", l))
            .unwrap_or_else(|| "n/a".to_string());
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{:+.2} pp</td><td>{:+.2} to {:+.2}</td>\
             <td>{}</td><td>{:.3}</td><td>{:.4}</td><td>{}</td></tr>\n",
            r.variant_id,
            r.rate_difference,
            r.confidence_interval.0,
            r.confidence_interval.1,
            lift,
            r.z_score,
            r.p_value,
            verdict(r),
        ));
    }

    let recommendation = match results.iter().find(|r| r.is_winner) {
        Some(w) => format!(
            "<span style='color:green;font-weight:bold'>Variant {} beats the control</span>",
            w.variant_id
        ),
        None => "<span style='color:gray'>No significant winner yet</span>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>A/B Significance Report</title>
<script src="https://cdn.plot.ly/plotly-2.12.1.min.js"></script>
<style>body{{font-family:monospace;max-width:1100px;margin:0 auto;padding:20px}}
table{{border-collapse:collapse;margin:15px 0}}
td,th{{padding:6px 14px;border-bottom:1px solid #ddd;text-align:left}}</style>
</head><body>
<h1>A/B Significance Report</h1>
<p>Generated: {}</p>
<p>{}</p>
<table>
<tr><th>Variant</th><th>Difference</th><th>95% CI</th><th>Improvement</th>
<th>Z</th><th>P</th><th>Verdict</th></tr>
{}
</table>
<div id="p1" style="height:420px"></div>
<script>
Plotly.newPlot('p1',[{{
  type:'bar',
  x:{},
  y:[{}],
  error_y:{{type:'data',array:[{}],visible:true}},
  marker:{{color:'steelblue'}}
}}],{{yaxis:{{title:'Conversion rate (%)',rangemode:'tozero'}},xaxis:{{title:'Variant'}}}});
</script></body></html>"#,
        timestamp,
        recommendation,
        rows,
        labels_json,
        rates_json.join(","),
        errors_json.join(","),
    )
}

/// 95% margin on a single arm's rate, in percentage points
fn rate_margin(v: &Variant) -> f64 {
    if v.visitors == 0 {
        return 0.0;
    }
    let rate = v.rate();
    Z_CRIT_95 * (rate * (1.0 - rate) / v.visitors as f64).sqrt() * 100.0
}
