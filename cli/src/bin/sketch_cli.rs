use clap::{Parser, Subcommand};
use cli::{collect_labelled_drawings, evaluate, Profile};
use color_eyre::eyre::{eyre, Result};
use sketch::{io::load_descriptor_file, SketchError, NO_FIGURE_LABEL};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Recognizer profile (.toml or .json); defaults apply when omitted
    #[arg(short, long, global = true)]
    profile: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one drawing
    Classify {
        /// Path to the drawing (PNG or JPEG)
        image: PathBuf,
        /// Descriptor file, overrides the profile
        #[arg(short, long)]
        descriptors: Option<PathBuf>,
        /// Also list the nearest labels with their distances
        #[arg(long, default_value = "1")]
        top: usize,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify a directory of `<label>/<drawing>` files and print a confusion matrix
    Evaluate {
        /// Directory with one subdirectory per expected label
        dir: PathBuf,
        /// Descriptor file, overrides the profile
        #[arg(short, long)]
        descriptors: Option<PathBuf>,
    },
    /// Check whether a drawing forms a closed shape
    Closure {
        /// Path to the drawing (PNG or JPEG)
        image: PathBuf,
        /// Save the filled region as a PNG
        #[arg(long)]
        save_mask: Option<PathBuf>,
    },
    /// Convert a delimited descriptor file to the JSON cache format
    Convert {
        /// Delimited text descriptor file
        input: PathBuf,
        /// Path to save the JSON database
        output: PathBuf,
    },
    /// Print the JSON schema of the profile file
    Schema {
        /// Write the schema to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();
    let profile_path = cli.profile.as_deref();

    match &cli.command {
        Commands::Classify { image, descriptors, top, json } => {
            classify(profile_path, image, descriptors.as_deref(), *top, *json)?;
        }
        Commands::Evaluate { dir, descriptors } => {
            evaluate_dir(profile_path, dir, descriptors.as_deref())?;
        }
        Commands::Closure { image, save_mask } => {
            check_closure(profile_path, image, save_mask.as_deref())?;
        }
        Commands::Convert { input, output } => {
            convert(input, output)?;
        }
        Commands::Schema { output } => {
            let schema = serde_json::to_string_pretty(&Profile::schema())?;
            match output {
                Some(path) => std::fs::write(path, schema)?,
                None => println!("{schema}"),
            }
        }
    }

    Ok(())
}

fn classify(
    profile_path: Option<&Path>,
    image_path: &Path,
    descriptors: Option<&Path>,
    top: usize,
    json: bool,
) -> Result<()> {
    let profile = Profile::load_or_default(profile_path)?;
    let recognizer = profile.recognizer(descriptors)?;
    let drawing = profile.load_drawing(image_path)?;

    let result = match recognizer.classify(&drawing) {
        Err(SketchError::NoShapeDetected) => {
            println!("{NO_FIGURE_LABEL}");
            return Ok(());
        }
        other => other?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.predicted_label);
    }

    if !result.closed {
        warn!("The figure is not closed; the label may be unreliable");
    }

    if top > 1 {
        for (rank, (label, distance)) in recognizer.rank(&drawing, top)?.iter().enumerate() {
            println!("{:>3}. {label:<20} {distance:.6}", rank + 1);
        }
    }

    Ok(())
}

fn evaluate_dir(profile_path: Option<&Path>, dir: &Path, descriptors: Option<&Path>) -> Result<()> {
    let profile = Profile::load_or_default(profile_path)?;
    let recognizer = profile.recognizer(descriptors)?;

    let samples = collect_labelled_drawings(dir)?;
    if samples.is_empty() {
        return Err(eyre!("No PNG or JPEG drawings found under {}", dir.display()));
    }
    info!("Evaluating {} drawings from {:?}", samples.len(), dir);

    let matrix = evaluate(&profile, &recognizer, &samples)?;
    println!("{matrix}");
    Ok(())
}

fn check_closure(profile_path: Option<&Path>, image_path: &Path, save_mask: Option<&Path>) -> Result<()> {
    let profile = Profile::load_or_default(profile_path)?;
    let pipeline = profile.recognizer.build_pipeline();
    let drawing = profile.load_drawing(image_path)?;

    let mask = pipeline.binarize(&drawing)?;
    let report = pipeline.validate(&mask);

    println!(
        "closed: {} (trapped pixels: {}, solid core: {})",
        report.closed, report.trapped_pixels, report.solid_core
    );

    if let Some(path) = save_mask {
        report.filled.as_gray().save(path)?;
        info!("Filled region saved to {:?}", path);
    }
    Ok(())
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let (database, report) = load_descriptor_file(input)?;
    for skipped in &report.skipped {
        warn!("{skipped}");
    }
    database.save_json(output)?;

    info!(
        "✅ Converted {} descriptors ({} labels) to {:?}",
        report.loaded,
        database.labels().len(),
        output
    );
    Ok(())
}
