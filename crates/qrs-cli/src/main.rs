use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use plotters::prelude::*;
use qrs_lib::{
    detectors::adaptive::{detect_r_peaks, run_detection_pipeline, DetectionSummary, PipelineConfig},
    io::{csv as csv_io, text as text_io, wfdb as wfdb_io},
    metrics::{
        accuracy::{score_detection, MatchResult},
        rr::{classify_rhythm, rr_statistics, ArrhythmiaVerdict, RRStatistics},
    },
    plot::{figure_with_beats, Figure, Series},
    signal::{Events, TimeSeries},
};
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "qrs",
    version,
    about = "Adaptive ECG beat detection and rhythm analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SignalArgs {
    /// Sampling frequency for text/stdin input (Hz)
    #[arg(long, default_value_t = 360.0)]
    fs: f64,
    /// Newline-delimited samples; stdin when no input source is given
    #[arg(long)]
    input: Option<PathBuf>,
    /// CSV export with a signal column
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long, default_value = "ecg")]
    csv_column: String,
    /// WFDB header (.hea); the matching .dat is read alongside it
    #[arg(long)]
    wfdb_header: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    lead: usize,
}

#[derive(clap::Args)]
struct PipelineArgs {
    #[arg(long, default_value_t = 5.0)]
    lowcut_hz: f64,
    #[arg(long, default_value_t = 15.0)]
    highcut_hz: f64,
    #[arg(long, default_value_t = 0.05)]
    integration_window_s: f64,
}

impl PipelineArgs {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            lowcut_hz: self.lowcut_hz,
            highcut_hz: self.highcut_hz,
            integration_window_s: self.integration_window_s,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Detect R-peaks and print them as JSON
    Detect {
        #[command(flatten)]
        signal: SignalArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// RR statistics and rhythm verdict from a newline-delimited peak list
    Analyze {
        #[arg(long)]
        peaks: PathBuf,
        #[arg(long, default_value_t = 360.0)]
        fs: f64,
        #[arg(long, default_value_t = 1.2)]
        ectopic_factor: f64,
    },
    /// Score detected peaks against reference annotations
    Score {
        /// Newline-delimited detected peak indices
        #[arg(long)]
        detected: PathBuf,
        /// Reference beats: WFDB .atr or newline-delimited indices
        #[arg(long)]
        reference: PathBuf,
        #[arg(long, default_value_t = 360.0)]
        fs: f64,
        #[arg(long, default_value_t = 100.0)]
        tolerance_ms: f64,
    },
    /// Full record pipeline: filter, envelope, detect, analyze, score
    Report {
        #[command(flatten)]
        signal: SignalArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Reference beats: WFDB .atr or newline-delimited indices
        #[arg(long)]
        annotations: Option<PathBuf>,
        #[arg(long, default_value_t = 100.0)]
        tolerance_ms: f64,
    },
    /// Render the signal with detected beats to a PNG
    Plot {
        #[command(flatten)]
        signal: SignalArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect { signal, pipeline } => cmd_detect(&signal, &pipeline)?,
        Commands::Analyze {
            peaks,
            fs,
            ectopic_factor,
        } => cmd_analyze(&peaks, fs, ectopic_factor)?,
        Commands::Score {
            detected,
            reference,
            fs,
            tolerance_ms,
        } => cmd_score(&detected, &reference, fs, tolerance_ms)?,
        Commands::Report {
            signal,
            pipeline,
            annotations,
            tolerance_ms,
        } => cmd_report(&signal, &pipeline, annotations.as_deref(), tolerance_ms)?,
        Commands::Plot {
            signal,
            pipeline,
            out,
        } => cmd_plot(&signal, &pipeline, &out)?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_f64_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf)
        }
    }
}

fn load_time_series(args: &SignalArgs) -> Result<TimeSeries> {
    if let Some(header) = &args.wfdb_header {
        wfdb_io::load_wfdb_lead(header, args.lead)
    } else if let Some(csv_path) = &args.csv {
        csv_io::read_ecg_csv(csv_path, &args.csv_column, args.fs)
    } else {
        let data = read_samples(args.input.as_deref())?;
        Ok(TimeSeries { fs: args.fs, data })
    }
}

fn load_reference_events(path: &Path) -> Result<Events> {
    let is_atr = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("atr"));
    if is_atr {
        wfdb_io::load_wfdb_events(path)
    } else {
        let indices = text_io::read_event_indices(path)?;
        Ok(Events::from_indices(indices))
    }
}

fn cmd_detect(signal: &SignalArgs, pipeline: &PipelineArgs) -> Result<()> {
    let ts = load_time_series(signal)?;
    let events = detect_r_peaks(&ts, &pipeline.config())?;
    info!("detected {} beats in {} samples", events.len(), ts.len());
    println!("{}", serde_json::to_string(&events)?);
    Ok(())
}

#[derive(Serialize)]
struct AnalysisOutput {
    stats: RRStatistics,
    verdict: ArrhythmiaVerdict,
}

fn cmd_analyze(peaks: &Path, fs: f64, ectopic_factor: f64) -> Result<()> {
    let indices = text_io::read_event_indices(peaks)?;
    let events = Events::from_indices(indices);
    let stats = rr_statistics(&events, fs)?;
    let verdict = classify_rhythm(&stats, ectopic_factor);
    println!("{}", serde_json::to_string(&AnalysisOutput { stats, verdict })?);
    Ok(())
}

fn cmd_score(detected: &Path, reference: &Path, fs: f64, tolerance_ms: f64) -> Result<()> {
    let detected = text_io::read_event_indices(detected)?;
    let reference = load_reference_events(reference)?;
    let result = score_detection(&detected, &reference.indices, fs, tolerance_ms)?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

#[derive(Serialize)]
struct ReportOutput {
    summary: DetectionSummary,
    accuracy: Option<MatchResult>,
}

fn cmd_report(
    signal: &SignalArgs,
    pipeline: &PipelineArgs,
    annotations: Option<&Path>,
    tolerance_ms: f64,
) -> Result<()> {
    let ts = load_time_series(signal)?;
    let summary = run_detection_pipeline(&ts, &pipeline.config())?;
    let accuracy = match annotations {
        Some(path) => {
            let reference = load_reference_events(path)?;
            Some(score_detection(
                &summary.events.indices,
                &reference.indices,
                ts.fs,
                tolerance_ms,
            )?)
        }
        None => None,
    };
    println!("{}", serde_json::to_string(&ReportOutput { summary, accuracy })?);
    Ok(())
}

fn cmd_plot(signal: &SignalArgs, pipeline: &PipelineArgs, out: &Path) -> Result<()> {
    let ts = load_time_series(signal)?;
    let events = detect_r_peaks(&ts, &pipeline.config())?;
    let fig = figure_with_beats("ECG with detected beats", &ts, &events, 4096);
    draw_figure(out, &fig).with_context(|| format!("rendering {}", out.display()))?;
    Ok(())
}

fn series_points(series: &Series) -> &[[f64; 2]] {
    match series {
        Series::Line(line) => &line.points,
        Series::Markers(markers) => &markers.points,
    }
}

fn rgb(color: u32) -> RGBColor {
    RGBColor(
        ((color >> 16) & 0xFF) as u8,
        ((color >> 8) & 0xFF) as u8,
        (color & 0xFF) as u8,
    )
}

fn draw_figure(path: &Path, fig: &Figure) -> Result<()> {
    let backend = BitMapBackend::new(path, (1024, 480));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for series in &fig.series {
        for p in series_points(series) {
            x_min = x_min.min(p[0]);
            x_max = x_max.max(p[0]);
            y_min = y_min.min(p[1]);
            y_max = y_max.max(p[1]);
        }
    }
    if !x_min.is_finite() || !x_max.is_finite() {
        (x_min, x_max, y_min, y_max) = (0.0, 1.0, 0.0, 1.0);
    }

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart.configure_mesh().draw()?;

    for series in &fig.series {
        match series {
            Series::Line(line) => {
                chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    &rgb(line.style.color.0),
                ))?;
            }
            Series::Markers(markers) => {
                let color = rgb(markers.style.color.0);
                let size = markers.style.width.max(1.0) as i32;
                chart.draw_series(
                    markers
                        .points
                        .iter()
                        .map(|p| Circle::new((p[0], p[1]), size, color.filled())),
                )?;
            }
        }
    }
    root.present()?;
    Ok(())
}
