use palocheck::{ensure_finalizable, Analyzer};
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <sheet.png> [mm_per_px] [out.json]", args[0]);
        std::process::exit(2);
    }

    let scale: Option<f64> = args.get(2).map(|s| s.parse()).transpose()?;
    let analyzer = Analyzer::new();
    let analysis = analyzer.analyze_path(Path::new(&args[1]), scale)?;

    let m = &analysis.metrics;
    println!(
        "Region confidence {:.2}, {} strokes, {} marks.",
        analysis.region.confidence,
        analysis.strokes.len(),
        analysis.marks.len()
    );
    match ensure_finalizable(m, true) {
        Ok(()) => println!(
            "Intervals {:?}: NOR {:?}, CV {:?}, trend {:?}",
            m.interval_counts, m.nor, m.cv, m.trend
        ),
        Err(e) => println!("Not reportable: {e}"),
    }

    if let Some(out_path) = args.get(3) {
        let json = serde_json::to_string_pretty(&analysis)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
