//! Slide Converter - tiled pyramidal TIFF writer.
//!
//! This binary opens a scene, plans the pyramid and writes it.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slide_converter::{
    config::{Cli, OutputFormat},
    converter::{create_tiff_or_remove, ProgressSink, TiffConverter},
    scene::{open_scene, Scene},
    ConvertError,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Conversion failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
///
/// `RUST_LOG` overrides the level derived from the options.
fn init_logging(log_level: u8, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        match log_level {
            0 | 1 => "error",
            2 => "warn",
            _ => "info",
        }
    };
    let env_filter = format!("slide_converter={}", level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<(), ConvertError> {
    if !cli.input.exists() {
        return Err(ConvertError::invalid_argument(format!(
            "input file {} does not exist",
            cli.input.display()
        )));
    }
    if !cli.info_only && cli.output.exists() {
        if !cli.delete_if_exists {
            return Err(ConvertError::invalid_state(format!(
                "output file {} already exists; use --delete-if-exists to overwrite it",
                cli.output.display()
            )));
        }
        std::fs::remove_file(&cli.output)?;
        info!("Deleted existing output {}", cli.output.display());
    }

    let scene: Arc<dyn Scene> = Arc::from(open_scene(&cli.input, &cli.driver, cli.scene_index)?);
    let params = cli.to_parameters(scene.as_ref())?;

    let mut converter = TiffConverter::new();
    converter.create_file_layout(Arc::clone(&scene), &params)?;

    if !cli.silent || cli.info_only {
        print_summary(cli, scene.as_ref(), &converter)?;
    }
    if cli.info_only {
        println!("Info-only mode: Conversion skipped.");
        return Ok(());
    }

    let start = Instant::now();
    if cli.silent {
        create_tiff_or_remove(&mut converter, &cli.output, None)?;
    } else {
        let mut bar = ConsoleProgress::new();
        let result = create_tiff_or_remove(&mut converter, &cli.output, Some(&mut bar));
        bar.finish(result.is_ok());
        result?;
    }

    if !cli.silent {
        println!("Conversion completed successfully.");
        println!("Elapsed time: {:.2} s", start.elapsed().as_secs_f64());
    }
    info!(
        "Converted {} to {} in {:.2} s",
        cli.input.display(),
        cli.output.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

// =============================================================================
// Summary
// =============================================================================

fn print_summary(cli: &Cli, scene: &dyn Scene, converter: &TiffConverter) -> Result<(), ConvertError> {
    let params = converter.parameters()?;
    let structure = converter.structure()?;

    match cli.output_format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "input": cli.input.display().to_string(),
                "output": cli.output.display().to_string(),
                "scene": {
                    "name": scene.name(),
                    "rect": scene.rect(),
                    "channels": scene.num_channels(),
                    "slices": scene.num_z_slices(),
                    "frames": scene.num_t_frames(),
                    "resolution": scene.resolution(),
                    "magnification": scene.magnification(),
                },
                "parameters": params,
                "structure": structure,
            });
            let text = serde_json::to_string_pretty(&json)
                .map_err(|e| ConvertError::invalid_state(format!("summary serialization: {}", e)))?;
            println!("{}", text);
        }
        OutputFormat::Text => {
            println!("Input:  {}", cli.input.display());
            println!("Output: {}", cli.output.display());
            println!("Scene:  {} {}", scene.name(), scene.rect());
            println!(
                "        {} channel(s), {} slice(s), {} frame(s)",
                scene.num_channels(),
                scene.num_z_slices(),
                scene.num_t_frames()
            );
            println!("Format: {} / {}", params.format, params.encoding.name());
            let tile = params.tile_size();
            println!(
                "Tiles:  {}x{}, {} zoom level(s), {} tile(s) total",
                tile.width,
                tile.height,
                params.num_zoom_levels(),
                structure.total_tiles
            );
            println!("Region: {}", structure.crop_rect);
            println!(
                "Pages:  {} ({} directories)",
                structure.num_pages(),
                structure.num_directories()
            );
            for (i, page) in structure.pages.iter().enumerate() {
                let d = &page.directory;
                println!(
                    "  [{}] channels {}..{} slice {} frame {} zoom {} (+{} sub-directories)",
                    i,
                    d.channel_range.start,
                    d.channel_range.end,
                    d.slice_range.start,
                    d.frame_range.start,
                    d.zoom_level_range.start,
                    page.num_sub_directories()
                );
            }
            if let Some(name) = Path::new(&scene.file_path()).file_name() {
                println!("Source: {}", name.to_string_lossy());
            }
        }
    }
    Ok(())
}

// =============================================================================
// Progress Bar
// =============================================================================

const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Terminal progress bar fed with conversion percentages.
struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(100);
        bar.set_style(style);
        bar.set_message("Converting");
        Self { bar }
    }

    fn finish(&self, completed: bool) {
        if completed {
            self.bar.finish_with_message("Done");
        } else {
            self.bar.abandon_with_message("Failed");
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&mut self, percent: u32) {
        self.bar.set_position(u64::from(percent.min(100)));
    }
}
