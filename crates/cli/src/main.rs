use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use logo_compose_core::{
    config::Config,
    encoding::ImageEncoder,
    error::AppError,
    init,
    intake::{ImageFile, IntakeSource},
    session::{ImageSlot, Session, WorkflowState, DOWNLOAD_FILE_NAME},
};
use serde::Serialize;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Instruction describing the edit
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,

    /// Base image (PNG, JPEG or WEBP, up to 4 MiB)
    #[arg(short, long)]
    base: PathBuf,

    /// Logo image (PNG, JPEG or WEBP, up to 4 MiB)
    #[arg(short, long)]
    logo: PathBuf,

    /// Where to write the generated image (file or directory)
    #[arg(short, long, default_value = DOWNLOAD_FILE_NAME)]
    output: PathBuf,

    /// Override the model defined in .env
    #[arg(short, long)]
    model: Option<String>,

    /// Accept any image/* type, like dropping files onto the window
    #[arg(long, default_value_t = false)]
    drag_drop: bool,

    /// Print the result data URI to stdout
    #[arg(long, default_value_t = false)]
    print_uri: bool,

    /// Print a JSON summary instead of plain text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    output: PathBuf,
    media_type: String,
    bytes: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    // Load config and override model if specified via CLI
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(m) = args.model {
        config.model_name = m;
    }

    let mut session = Session::from_config(&config).context("Failed to initialize Gemini client")?;
    let source = if args.drag_drop {
        IntakeSource::DragDrop
    } else {
        IntakeSource::Picker
    };

    for (slot, path) in [(ImageSlot::Base, &args.base), (ImageSlot::Logo, &args.logo)] {
        let candidate = ImageFile::from_path(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        session
            .select_image(slot, candidate, source)
            .await
            .map_err(explain)
            .with_context(|| format!("Rejected {}", path.display()))?;
    }

    // If prompt was empty, ask now
    let mut prompt_text = args.prompt.join(" ");
    if prompt_text.trim().is_empty() {
        eprint!("Enter instruction: ");
        io::stderr().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        prompt_text = input.trim().to_string();
    }
    session.set_instruction(prompt_text);

    // Send to API
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!("Generating with {}...", config.model_name));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = session.submit_and_wait().await.map(Clone::clone);
    spinner.finish_and_clear();

    match outcome.map_err(explain)? {
        WorkflowState::Succeeded(uri) => {
            let saved = session
                .save_result(&args.output)
                .await
                .context("Failed to save generated image")?;

            if args.print_uri {
                println!("{}", uri);
            }

            let (media_type, bytes) = ImageEncoder::parse_data_uri(&uri)?;
            if args.json {
                let summary = Summary {
                    output: saved,
                    media_type,
                    bytes: bytes.len(),
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if !args.print_uri {
                println!("Saved {} ({}, {} bytes)", saved.display(), media_type, bytes.len());
            }
        }
        WorkflowState::Failed(message) => bail!("Generation failed: {}", message),
        other => bail!("Unexpected state after request: {:?}", other),
    }

    Ok(())
}

/// Adds a hint to errors the user can fix by changing the input.
fn explain(err: AppError) -> anyhow::Error {
    if err.is_validation() {
        anyhow::Error::new(err).context("Invalid input, check the image files and instruction")
    } else {
        anyhow::Error::new(err)
    }
}
