mod ai;
mod capture;
mod config;
mod describe;
mod error;
mod logging;
mod narrative;
mod pipeline;
mod scene;
mod script;
mod store;
#[cfg(test)]
mod testing;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::ai::OpenAi;
use crate::config::{Config, Overrides};
use crate::logging::AnalysisLog;
use crate::narrative::NarrationStyle;
use crate::pipeline::NarrationSettings;

#[derive(Parser)]
#[command(name = "tournarrate")]
#[command(about = "Turn a walkthrough video into a narrated tour script", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[command(flatten)]
    options: Options,
}

#[derive(Args)]
struct Options {
    /// Directory that receives the `<video>_analysis` folders [env: NARRATOR_OUTPUT_ROOT]
    #[arg(short, long, global = true)]
    output_root: Option<PathBuf>,
    /// Pause between frame descriptions [env: NARRATOR_FRAME_DELAY_MS]
    #[arg(long, global = true)]
    frame_delay_ms: Option<u64>,
    /// [env: NARRATOR_VISION_MODEL]
    #[arg(long, global = true)]
    vision_model: Option<String>,
    /// [env: NARRATOR_TEXT_MODEL]
    #[arg(long, global = true)]
    text_model: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Sample one frame per second and describe each one
    Analyze { video: PathBuf },
    /// Write a narrative script from a narration_results.json document
    Narrate {
        results: PathBuf,
        #[arg(short, long, value_enum, default_value_t = NarrationStyle::Natural)]
        style: NarrationStyle,
    },
    /// Analyze a video and narrate it in one go
    Run {
        video: PathBuf,
        #[arg(short, long, value_enum, default_value_t = NarrationStyle::Natural)]
        style: NarrationStyle,
    },
}

fn print_status(message: &str) {
    println!("{message}");
}

async fn execute(
    command: Command,
    config: &Config,
    analysis_log: &AnalysisLog,
) -> anyhow::Result<PathBuf> {
    let openai = OpenAi::new(config);
    let settings = NarrationSettings::from(config);

    let path = match command {
        Command::Analyze { video } => {
            let output_dir = pipeline::output_dir_for(&video, &config.output_root);
            let sampler = pipeline::load_video(&video, &output_dir, &print_status)?;
            analysis_log.attach(&output_dir)?;
            let (_, store_path) = pipeline::analyze(
                sampler,
                &output_dir,
                &openai,
                config.frame_delay,
                &print_status,
            )
            .await?;
            store_path
        }
        Command::Narrate { results, style } => {
            pipeline::narrate_file(&results, style, &openai, &settings, &print_status).await?
        }
        Command::Run { video, style } => {
            let output_dir = pipeline::output_dir_for(&video, &config.output_root);
            let sampler = pipeline::load_video(&video, &output_dir, &print_status)?;
            analysis_log.attach(&output_dir)?;
            let (result, store_path) = pipeline::analyze(
                sampler,
                &output_dir,
                &openai,
                config.frame_delay,
                &print_status,
            )
            .await?;
            pipeline::narrate(&result, &store_path, style, &openai, &settings, &print_status)
                .await?
        }
    };
    Ok(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let analysis_log = AnalysisLog::default();
    logging::init(analysis_log.clone());

    let config = Config::load(Overrides {
        output_root: cli.options.output_root,
        frame_delay_ms: cli.options.frame_delay_ms,
        vision_model: cli.options.vision_model,
        text_model: cli.options.text_model,
    })?;

    match execute(cli.command, &config, &analysis_log).await {
        Ok(path) => {
            println!("Done. Saved to: {}", path.display());
            Ok(())
        }
        Err(e) => {
            tracing::error!("{e:#}");
            Err(e)
        }
    }
}
