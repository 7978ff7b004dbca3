// Heatmap CLI with the migration bias held fixed
//
// Renders the 3x3 grid of attachment rate (x) by attachment lifetime (y);
// each cell is the average live cancer cell count over the completed runs
// at that parameter combination.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use immune_sweep::pipeline::{self, PipelineOptions, Stage};
use immune_sweep::render::RenderOptions;
use immune_sweep::types::{SweepLayout, MIGRATION_BIAS_LEVELS};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "heatmap_fixed_bias")]
#[command(about = "Render the live-cell heatmap for one migration bias", long_about = None)]
struct Args {
    /// Migration bias held fixed (0.25, 0.5, or 0.75)
    fixed_bias: f64,

    /// Directory containing final_analysis.txt and run_rate_lifetime_bias.txt
    #[arg(short, long, default_value = ".")]
    input_dir: PathBuf,

    /// Directory the outputs are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Image width in pixels
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 1440)]
    height: u32,

    /// Also write a JSON summary of the grid next to the image
    #[arg(long, default_value_t = false)]
    export_summary: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("\nCancer-Immune Sweep Heatmap");
    println!("=======================================");
    println!("  Fixed: migration bias = {}", args.fixed_bias);
    println!("  Allowed biases: {:?}", MIGRATION_BIAS_LEVELS);
    println!("  Axes: attachment rate (x), attachment lifetime (y)");
    println!("  Resolution: {}x{}", args.width, args.height);
    println!("=======================================\n");

    let options = PipelineOptions {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        render: RenderOptions {
            width: args.width,
            height: args.height,
            ..RenderOptions::default()
        },
        export_summary: args.export_summary,
    };

    let pb = ProgressBar::new(4);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓▒░ "),
    );

    let result = pipeline::run(
        SweepLayout::fixed_bias(),
        args.fixed_bias,
        &options,
        |stage| {
            pb.set_message(match stage {
                Stage::LoadMetrics => "Loading metrics table...",
                Stage::LoadParameters => "Loading parameter table...",
                Stage::Aggregate => "Aggregating runs...",
                Stage::Render => "Rendering heatmap...",
            });
            pb.inc(1);
        },
    );

    let output = match result {
        Ok(output) => output,
        Err(err) => {
            pb.abandon_with_message("✗ failed");
            eprintln!("\nerror: {err}");
            process::exit(1);
        }
    };

    pb.finish_with_message("✓ Heatmap complete");

    println!("\n📊 Cell means (N = completed runs):");
    println!("{}", pipeline::grid_report(&output.grid));
    println!("  Runs matched: {}", output.grid.total_samples());

    println!("\n✨ Done!");
    println!("📁 {}", output.image_path.display());
    if let Some(summary_path) = &output.summary_path {
        println!("📁 {}", summary_path.display());
    }

    Ok(())
}
