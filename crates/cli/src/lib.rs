use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use takeoff_core::{
    default_renderer, CsvSink, EngineConfig, ExportSink, JsonSink, Modifiers, Point, ScaleInput,
    SourceRef, StatusLevel, TakeoffEngine, TakeoffSnapshot, Tool,
};

#[derive(Debug, Parser)]
#[command(name = "takeoff-cli")]
#[command(about = "Takeoff measurement CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable document metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Renderer target scale for the reported surface size.
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
    },
    /// Replay a measurement script against a drawing and export the result.
    Measure {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// JSON array of steps; positions are page pixels.
        #[arg(long)]
        script: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// TOML engine configuration; TAKEOFF_* variables still apply.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the export here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

/// One scripted user interaction
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Page { index: u32 },
    Scale { value: f64 },
    Calibrate { from: Point, to: Point, distance: f64 },
    Unit { unit: String },
    Line {
        from: Point,
        to: Point,
        #[serde(default)]
        shift: bool,
    },
    Area { from: Point, to: Point },
    Polygon { points: Vec<Point> },
    /// Delete the n-th measurement of the current page
    Delete { index: usize },
    ZoomIn,
    ZoomOut,
    ResetView,
    Pan { dx: f64, dy: f64 },
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    render_scale: f32,
    first_page_px: SurfaceOutput,
}

#[derive(Debug, Serialize)]
struct SurfaceOutput {
    width: u32,
    height: u32,
}

/// Logs engine status messages; errors are already returned to the caller
struct CliObserver;

impl takeoff_core::EngineObserver for CliObserver {
    fn status(&self, level: StatusLevel, message: &str) {
        match level {
            StatusLevel::Error => tracing::debug!(%level, "{message}"),
            _ => tracing::info!(%level, "{message}"),
        }
    }
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file, scale } => run_info(&file, scale),
        Commands::Measure {
            file,
            script,
            format,
            config,
            output,
        } => run_measure(&file, &script, format, config.as_deref(), output.as_deref()),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path, scale: f32) -> Result<()> {
    ensure_file_exists(file)?;

    let config = EngineConfig::default().with_render_scale(scale);
    let mut engine = new_engine(config)?;
    engine
        .load_document(SourceRef::from(file))
        .context("failed to open drawing")?;
    let session = engine.session().context("no document open")?;

    let surface = session.surface();
    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count: session.page_count(),
        render_scale: scale,
        first_page_px: SurfaceOutput {
            width: surface.width,
            height: surface.height,
        },
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    engine.close();
    Ok(())
}

fn run_measure(
    file: &Path,
    script: &Path,
    format: ExportFormat,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    ensure_file_exists(file)?;
    ensure_file_exists(script)?;

    let config = match config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?
            .apply_env()?,
        None => EngineConfig::from_env()?,
    };

    let raw = fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid script {}", script.display()))?;

    let mut engine = new_engine(config)?;
    engine
        .load_document(SourceRef::from(file))
        .context("failed to open drawing")?;

    for (number, step) in steps.iter().enumerate() {
        tracing::debug!(step = number + 1, ?step, "Replaying step");
        apply_step(&mut engine, step).with_context(|| format!("step {} failed", number + 1))?;
    }

    let snapshot = engine.export_snapshot()?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_snapshot(&snapshot, format, BufWriter::new(file))?;
            println!("{}", path.display());
        }
        None => write_snapshot(&snapshot, format, io::stdout().lock())?,
    }

    engine.close();
    Ok(())
}

fn new_engine(config: EngineConfig) -> Result<TakeoffEngine> {
    let engine = TakeoffEngine::new(Box::new(default_renderer()), config, Box::new(CliObserver))?;
    Ok(engine)
}

fn write_snapshot<W: Write>(snapshot: &TakeoffSnapshot, format: ExportFormat, writer: W) -> Result<()> {
    match format {
        ExportFormat::Json => JsonSink::new(writer).export(snapshot)?,
        ExportFormat::Csv => CsvSink::new(writer).export(snapshot)?,
    }
    Ok(())
}

fn apply_step(engine: &mut TakeoffEngine, step: &Step) -> Result<()> {
    match step {
        Step::Page { index } => {
            engine.set_page(*index)?;
        }
        Step::Scale { value } => {
            engine.set_scale(ScaleInput::Manual(*value))?;
        }
        Step::Calibrate { from, to, distance } => {
            engine.set_tool(Tool::ScaleCalibration);
            click(engine, *from);
            click(engine, *to);
            engine.confirm_calibration(*distance)?;
        }
        Step::Unit { unit } => {
            engine.set_unit(unit.as_str())?;
        }
        Step::Line { from, to, shift } => {
            engine.set_tool(Tool::Line);
            let modifiers = if *shift {
                Modifiers::shift()
            } else {
                Modifiers::NONE
            };
            drag(engine, *from, *to, modifiers);
        }
        Step::Area { from, to } => {
            engine.set_tool(Tool::Area);
            drag(engine, *from, *to, Modifiers::NONE);
        }
        Step::Polygon { points } => {
            engine.set_tool(Tool::Polygon);
            for point in points {
                click(engine, *point);
            }
            engine.finish_polygon();
        }
        Step::Delete { index } => {
            let id = engine
                .list_measurements()
                .get(*index)
                .map(|measurement| measurement.id)
                .with_context(|| format!("no measurement at index {index}"))?;
            engine.delete_measurement(id);
        }
        Step::ZoomIn => {
            engine.zoom_in();
        }
        Step::ZoomOut => {
            engine.zoom_out();
        }
        Step::ResetView => {
            engine.reset_view();
        }
        Step::Pan { dx, dy } => {
            engine.set_tool(Tool::Pan);
            let start = Point::new(0.0, 0.0);
            engine.on_pointer_down(start, Modifiers::NONE);
            engine.on_pointer_move(Point::new(*dx, *dy), Modifiers::NONE);
            engine.on_pointer_up(Point::new(*dx, *dy), Modifiers::NONE);
        }
    }
    Ok(())
}

/// Page position to the screen position the engine expects from a pointer
fn to_screen(engine: &TakeoffEngine, page: Point) -> Point {
    engine
        .session()
        .map_or(page, |session| session.viewport().page_to_screen(page))
}

fn click(engine: &mut TakeoffEngine, page: Point) {
    let screen = to_screen(engine, page);
    engine.on_pointer_down(screen, Modifiers::NONE);
    engine.on_pointer_up(screen, Modifiers::NONE);
}

fn drag(engine: &mut TakeoffEngine, from: Point, to: Point, modifiers: Modifiers) {
    let from = to_screen(engine, from);
    let to = to_screen(engine, to);
    engine.on_pointer_down(from, modifiers);
    engine.on_pointer_move(to, modifiers);
    engine.on_pointer_up(to, modifiers);
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
