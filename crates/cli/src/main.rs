//! CLI tool for generating narration scripts from PowerPoint files.

use anyhow::{Context, Result};
use clap::Parser;
use pptscript_core::{
    build_context, Config, ContentExtractor, LoadMode, ScriptGenerator, DEFAULT_QUESTION,
};
use pptscript_openai::OpenAiChatModel;
use pptscript_pptx::PptxLoader;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Deck used when no path is given.
const DEFAULT_INPUT: &str = "../data/ml_course.pptx";

/// Generate a narration script from a PowerPoint deck.
#[derive(Parser, Debug)]
#[command(name = "pptscript")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PowerPoint file (.pptx)
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Model to use (overrides MODEL_NAME)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature between 0.0 and 1.0 (overrides TEMPERATURE)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// How the deck is split before grouping by slide: single, elements or paged
    #[arg(long, default_value = "elements")]
    mode: LoadMode,

    /// Also write the script to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the extracted context and stop before calling the model
    #[arg(long)]
    context_only: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build the configuration from the environment plus command-line overrides.
fn load_config(args: &Args) -> Result<Config> {
    load_config_from(|key| std::env::var(key).ok(), args)
}

fn load_config_from<F>(lookup: F, args: &Args) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::from_lookup(lookup).context("Failed to read configuration")?;
    if let Some(model) = &args.model {
        config = config.with_model(model.clone());
    }
    if let Some(temperature) = args.temperature {
        config = config.with_temperature(temperature)?;
    }
    if args.verbose {
        config = config.with_verbose(true);
    }
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;

    // Initialize logging
    if config.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let context = extract_context(&args.input, args.mode, &config)?;

    if args.context_only {
        print!("{}", context);
        return Ok(());
    }

    let model = OpenAiChatModel::from_env()?;
    let generator = ScriptGenerator::new(model, &config);
    let script = generator.generate_script(&context, DEFAULT_QUESTION)?;

    println!("\n--- Generated Script ---\n");
    println!("{}", script);

    if let Some(path) = &args.output {
        write_output(path, &script)?;
        log::info!("Written to: {}", path.display());
    }

    Ok(())
}

/// Extract slide text and flatten it into the model context.
fn extract_context(input_path: &Path, mode: LoadMode, config: &Config) -> Result<String> {
    let extractor = ContentExtractor::new(PptxLoader::new()).with_verbose(config.verbose);
    let pages = extractor.extract(input_path, mode)?;

    log::info!("Found text on {} slides", pages.len());

    let built = build_context(&pages)?;
    if !built.skipped.is_empty() {
        log::warn!("Skipped {} slides with unusable content", built.skipped.len());
    }

    Ok(built.context)
}

/// Write output to a file.
fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
