use anyhow::{anyhow, Context, Result};
use classifier::{Classifier, HttpClassifier, NoClassifier};
use engine::{Analysis, Engine, Timing};
use feedback::FeedbackGenerator;
use geometry::Projection;
use indicatif::{ProgressBar, ProgressStyle};
use profile::Profiles;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::sync_channel,
        Arc,
    },
    time::Duration,
};
use structopt::StructOpt;
use tracing::{info, trace, warn};
use tracing_subscriber::layer::SubscriberExt;

mod classifier;
mod engine;
mod error;
mod extract;
mod feedback;
mod frame;
mod geometry;
mod pose;
mod profile;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    /// A TOML file of pose profile overrides, keyed by pose name.
    #[structopt(short, long)]
    profiles: Option<PathBuf>,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print corrective feedback for each frame of landmarks.
    Analyze(AnalyzeOpt),
    /// Print the joint angles of each frame of landmarks.
    Angles {
        /// JSON-lines frame file; stdin when omitted.
        input: Option<PathBuf>,

        /// Include landmark depth in angle computation.
        #[structopt(short, long)]
        depth: bool,
    },
    /// Print the active pose profiles.
    Profiles,
}

#[derive(structopt::StructOpt)]
struct AnalyzeOpt {
    /// JSON-lines frame file; stdin when omitted.
    input: Option<PathBuf>,

    /// Classification backend for frames that carry no pose label.
    #[structopt(short, long)]
    classifier_url: Option<String>,

    /// Classification request timeout.
    #[structopt(short, long, default_value = "2000")]
    timeout_ms: u64,

    /// Retries for a failed classification request.
    #[structopt(short, long, default_value = "2")]
    retries: u32,

    /// Include landmark depth in angle computation.
    #[structopt(short, long)]
    depth: bool,

    /// Predictions below this confidence get no feedback.
    #[structopt(short, long, default_value = "0.0")]
    min_confidence: f32,

    /// Emit one JSON object per frame.
    #[structopt(short, long)]
    json: bool,

    #[structopt(short, long, default_value = "64")]
    queue_size: usize,

    #[structopt(short, long)]
    show_progress: bool,
}

fn projection(depth: bool) -> Projection {
    if depth {
        Projection::Depth
    } else {
        Projection::Image
    }
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

#[derive(serde::Serialize)]
struct Record<'a, 'b> {
    frame: usize,
    #[serde(flatten)]
    analysis: &'a Analysis<'b>,
}

fn write_analysis<W: Write>(out: &mut W, frame: usize, analysis: &Analysis<'_>, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer(&mut *out, &Record { frame, analysis })?;
        writeln!(out)?;
        return Ok(());
    }

    match analysis {
        Analysis::PredictionUnavailable { reason } => {
            writeln!(out, "[{}] prediction unavailable: {}", frame, reason)?
        }
        Analysis::Waiting => writeln!(out, "[{}] waiting for a pose", frame)?,
        Analysis::LowConfidence { label, confidence } => writeln!(
            out,
            "[{}] {} ({:.0}%): confidence too low for feedback",
            frame,
            label,
            confidence * 100.0
        )?,
        Analysis::Feedback {
            label,
            confidence,
            feedback,
            ..
        } => {
            writeln!(out, "[{}] {} ({:.0}%)", frame, label, confidence * 100.0)?;
            for line in feedback.to_string().lines() {
                writeln!(out, "    {}", line)?;
            }
        }
    }
    Ok(())
}

fn write_failure<W: Write>(out: &mut W, frame: usize, error: &error::Error, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer(
            &mut *out,
            &serde_json::json!({ "frame": frame, "state": "failed", "error": error.to_string() }),
        )?;
        writeln!(out)?;
    } else {
        writeln!(out, "[{}] analysis failed: {}", frame, error)?;
    }
    Ok(())
}

fn analyze(opt: AnalyzeOpt, profiles: Profiles) -> Result<()> {
    let classifier: Box<dyn Classifier + Send> = match &opt.classifier_url {
        Some(url) => Box::new(
            HttpClassifier::new(url.as_str(), Duration::from_millis(opt.timeout_ms), opt.retries)
                .context("failed constructing classifier")?,
        ),
        None => Box::new(NoClassifier),
    };
    let engine = Engine::new(
        FeedbackGenerator::new(profiles),
        projection(opt.depth),
        opt.min_confidence,
    );
    let json = opt.json;
    let input = open_input(opt.input.as_deref())?;

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();

    ctrlc::set_handler(move || {
        running_ctrl_c.store(false, Ordering::SeqCst);
    })
    .context("failed setting Ctrl-C handler")?;

    let pb_cycles = if opt.show_progress {
        Some(
            ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{prefix:.bold.dim} {spinner} {wide_msg}"),
            ),
        )
    } else {
        None
    };

    let (frames_tx, frames_rx) = sync_channel(opt.queue_size);
    let running_read = running.clone();

    let timing = crossbeam::thread::scope(|scope| {
        let reader = scope.spawn(move |_| {
            for item in frame::read_frames(input) {
                if !running_read.load(Ordering::SeqCst) {
                    break;
                }
                let (n, frame) = item.context("failed reading frames")?;
                let prepared = frame::prepare(frame, &*classifier);
                if let Ok((skeleton, _)) = &prepared {
                    trace!(message = "read frame", frame = n, landmarks = skeleton.len());
                }
                if frames_tx.send((n, prepared)).is_err() {
                    break;
                }
            }
            Ok::<_, anyhow::Error>(())
        });

        let analyzer = scope.spawn(move |_| {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let mut timing = Timing::default();

            while let Ok((n, prepared)) = frames_rx.recv() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let cycle = prepared
                    .and_then(|(skeleton, prediction)| engine.analyze(&skeleton, prediction));
                match cycle {
                    Ok(cycle) => {
                        timing.record(cycle.elapsed);
                        write_analysis(&mut out, n, &cycle.analysis, json)?;
                    }
                    Err(e) => {
                        warn!(message = "analysis failed", frame = n, error = %e);
                        write_failure(&mut out, n, &e, json)?;
                    }
                }

                if let Some(pb_cycles) = pb_cycles.as_ref() {
                    pb_cycles.set_message(format!(
                        "frames: {}, mean analysis: {:?}",
                        timing.cycles,
                        timing.mean()
                    ));
                    pb_cycles.inc(1);
                }
            }
            out.flush()?;
            if let Some(pb_cycles) = pb_cycles {
                pb_cycles.finish_and_clear();
            }
            Ok::<_, anyhow::Error>(timing)
        });

        let timing = analyzer
            .join()
            .map_err(|_| anyhow!("analysis thread panicked"))??;
        reader
            .join()
            .map_err(|_| anyhow!("frame reader thread panicked"))??;
        Ok::<_, anyhow::Error>(timing)
    })
    .map_err(|_| anyhow!("frame pipeline panicked"))??;

    info!(
        message = "analysis finished",
        frames = timing.cycles,
        mean = ?timing.mean()
    );
    Ok(())
}

fn angles(input: Option<&Path>, depth: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for item in frame::read_frames(open_input(input)?) {
        let (n, frame) = item.context("failed reading frames")?;
        let angles = frame
            .and_then(|frame| frame.skeleton())
            .and_then(|skeleton| extract::extract_angles(&skeleton, projection(depth)));
        match angles {
            Ok(angles) => {
                let columns: Vec<String> = angles
                    .iter()
                    .map(|sample| match sample.angle {
                        Some(angle) => format!("{}={}", sample.joint, angle),
                        None => format!("{}=-", sample.joint),
                    })
                    .collect();
                writeln!(out, "[{}] {}", n, columns.join(", "))?;
            }
            Err(e) => writeln!(out, "[{}] extraction failed: {}", n, e)?,
        }
    }
    Ok(())
}

fn print_profiles(profiles: &Profiles) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (asana, profile) in profiles.iter() {
        writeln!(
            out,
            "{} ({}), tolerance {}°",
            asana,
            asana.model_label(),
            profile.tolerance
        )?;
        for joint in pose::Joint::ALL.iter().copied() {
            writeln!(out, "    {:<15}{}°", joint.name(), profile.ideal(joint))?;
        }
        writeln!(out, "    {}", profiles.guidance(asana))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(opt.log_level),
    )?;

    let profiles = match &opt.profiles {
        Some(path) => Profiles::load(path).context("failed loading pose profiles")?,
        None => Profiles::builtin(),
    };

    match opt.command {
        Command::Analyze(analyze_opt) => analyze(analyze_opt, profiles),
        Command::Angles { input, depth } => angles(input.as_deref(), depth),
        Command::Profiles => print_profiles(&profiles),
    }
}
