//! The `lumen process` command for ingesting images.

use clap::{Args, ValueEnum};
use lumen_core::{
    Config, ImagePipeline, OutputFormat as CoreOutputFormat, OutputWriter, ProcessOptions,
    ProcessingOutcome,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Image files to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Coldpreview bounding box in pixels (>= 150); omit to skip
    /// coldpreview generation
    #[arg(long)]
    pub coldpreview_size: Option<u32>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Output format choices exposed on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Json,
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, config: Config) -> anyhow::Result<()> {
    let pipeline = ImagePipeline::new(&config);
    let options = ProcessOptions {
        coldpreview_size: args.coldpreview_size,
    };

    tracing::info!("Processing {} image(s)", args.inputs.len());

    let mut outcomes = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let result = pipeline.process_path(path, &options).await;
        if let Err(ref e) = result {
            tracing::warn!("{}: {e}", path.display());
        }
        outcomes.push(ProcessingOutcome::from_result(result));
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();

    match args.output {
        Some(ref output_path) => {
            let file = File::create(output_path)?;
            let mut writer =
                OutputWriter::new(BufWriter::new(file), args.format.into(), args.pretty);
            writer.write_all(&outcomes)?;
            writer.flush()?;
            tracing::info!("Output written to {:?}", output_path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = OutputWriter::new(stdout.lock(), args.format.into(), args.pretty);
            if outcomes.len() == 1 {
                writer.write(&outcomes[0])?;
            } else {
                writer.write_all(&outcomes)?;
            }
            writer.flush()?;
        }
    }

    if failed > 0 {
        tracing::warn!("{failed}/{} input(s) failed", outcomes.len());
    }
    Ok(())
}
