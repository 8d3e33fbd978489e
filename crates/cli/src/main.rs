use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facerelay_core::detection::domain::angle_estimator::AngleEstimator;
use facerelay_core::detection::domain::face_verifier::FaceVerifier;
use facerelay_core::detection::infrastructure::fast_patch_extractor::FastPatchExtractor;
use facerelay_core::detection::infrastructure::intensity_eye_detector::IntensityEyeDetector;
use facerelay_core::detection::infrastructure::model_store;
use facerelay_core::detection::infrastructure::rustface_proposal_detector::RustfaceProposalDetector;
use facerelay_core::pipeline::performance_tracker::{PerformanceTracker, DEFAULT_WINDOW};
use facerelay_core::pipeline::proposal_pipeline::ProposalPipeline;
use facerelay_core::pipeline::session_loop::{SessionLoop, SessionLoopConfig};
use facerelay_core::shared::constants::MAX_CHUNK_PAYLOAD;
use facerelay_core::transport::domain::frame_transport::FrameTransport;
use facerelay_core::transport::infrastructure::datagram_transport::DatagramTransport;
use facerelay_core::transport::infrastructure::stream_transport::StreamTransport;
use facerelay_core::video::domain::frame_source::FrameSource;
use facerelay_core::video::infrastructure::image_sequence_source::ImageSequenceSource;
use facerelay_core::video::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;

/// Realtime face detection and streaming to a single remote consumer.
#[derive(Parser)]
#[command(name = "facerelay")]
struct Cli {
    /// Directory of image frames to stream (stands in for a camera).
    #[arg(long)]
    source: PathBuf,

    /// Replay the source directory in a loop.
    #[arg(long)]
    loop_source: bool,

    /// SeetaFace detection model file for the proposal stage.
    #[arg(long)]
    detector_model: PathBuf,

    /// Transport variant: udp (chunked, loss-tolerant) or tcp (stream).
    #[arg(long, default_value = "udp")]
    transport: String,

    /// Listening host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Listening port.
    #[arg(long, default_value = "5006")]
    port: u16,

    /// Target frame rate.
    #[arg(long, default_value = "30.0")]
    fps: f64,

    /// JPEG quality (1-100).
    #[arg(long, default_value = "70")]
    quality: u8,

    /// Maximum payload bytes per datagram chunk.
    #[arg(long, default_value = "60000")]
    chunk_size: usize,

    /// Directory holding the verifier artifacts (codebook.json,
    /// classifier.json). Defaults to the per-user models directory.
    #[arg(long)]
    models: Option<PathBuf>,

    /// Skip verification even when artifacts are available.
    #[arg(long)]
    no_verify: bool,

    /// Margin the verifier confidence must exceed for acceptance.
    #[arg(long, default_value = "0.0")]
    confidence_threshold: f64,

    /// IoU threshold for candidate suppression (0.0-1.0).
    #[arg(long, default_value = "0.3")]
    iou_threshold: f64,

    /// Minimum proposal side length in pixels.
    #[arg(long, default_value = "80")]
    min_face_size: u32,

    /// Seconds between periodic statistics reports.
    #[arg(long, default_value = "1.0")]
    stats_interval: f64,

    /// Rolling window size for performance statistics.
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    window: usize,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(cancelled.clone());

    let bind_addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    let transport = build_transport(&cli, bind_addr, cancelled.clone())?;

    let detector = Box::new(RustfaceProposalDetector::new(
        &cli.detector_model,
        cli.min_face_size,
    )?);
    let verifier = build_verifier(&cli);
    if verifier.is_some() {
        log::info!("verification enabled");
    }

    let pipeline = ProposalPipeline::new(
        detector,
        verifier,
        cli.confidence_threshold,
        cli.iou_threshold,
    );
    let angle_estimator = AngleEstimator::new(Box::new(IntensityEyeDetector::new()));
    let source: Box<dyn FrameSource> =
        Box::new(ImageSequenceSource::new(&cli.source, cli.loop_source));

    let config = SessionLoopConfig {
        target_fps: cli.fps,
        jpeg_quality: cli.quality,
        stats_interval: Duration::from_secs_f64(cli.stats_interval),
    };

    let mut session = SessionLoop::new(
        source,
        pipeline,
        angle_estimator,
        Box::new(JpegFrameEncoder::new()),
        transport,
        PerformanceTracker::new(cli.window),
        config,
        cancelled,
    );
    session.run()
}

fn install_interrupt_handler(cancelled: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        cancelled.store(true, Ordering::Relaxed);
    }) {
        log::warn!("failed to install interrupt handler: {e}");
    }
}

fn build_transport(
    cli: &Cli,
    bind_addr: SocketAddr,
    cancelled: Arc<AtomicBool>,
) -> Result<Box<dyn FrameTransport>, Box<dyn std::error::Error>> {
    match cli.transport.as_str() {
        "udp" => Ok(Box::new(DatagramTransport::new(
            bind_addr,
            cli.chunk_size,
            cancelled,
        )?)),
        "tcp" => Ok(Box::new(StreamTransport::new(bind_addr, cancelled)?)),
        other => Err(format!("unknown transport '{other}'").into()),
    }
}

/// Loads verification artifacts, degrading to proposal-only mode when
/// they are missing or unusable.
fn build_verifier(cli: &Cli) -> Option<FaceVerifier> {
    if cli.no_verify {
        return None;
    }

    let models_dir = match &cli.models {
        Some(dir) => dir.clone(),
        None => match model_store::default_models_dir() {
            Ok(dir) => dir,
            Err(e) => {
                log::warn!("verification disabled: {e}");
                return None;
            }
        },
    };

    match model_store::load(&models_dir) {
        Ok(artifacts) => Some(FaceVerifier::new(
            Box::new(FastPatchExtractor::new()),
            artifacts.codebook,
            artifacts.classifier,
        )),
        Err(e) => {
            log::warn!("verification disabled, running proposal-only: {e}");
            None
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.source.is_dir() {
        return Err(format!("Source directory not found: {}", cli.source.display()).into());
    }
    if !cli.detector_model.exists() {
        return Err(format!(
            "Detector model not found: {}",
            cli.detector_model.display()
        )
        .into());
    }
    if cli.transport != "udp" && cli.transport != "tcp" {
        return Err(format!("Transport must be 'udp' or 'tcp', got '{}'", cli.transport).into());
    }
    if cli.fps <= 0.0 {
        return Err(format!("Target fps must be positive, got {}", cli.fps).into());
    }
    if cli.quality == 0 || cli.quality > 100 {
        return Err(format!("Quality must be between 1 and 100, got {}", cli.quality).into());
    }
    if cli.chunk_size == 0 || cli.chunk_size > MAX_CHUNK_PAYLOAD {
        return Err(format!(
            "Chunk size must be between 1 and {MAX_CHUNK_PAYLOAD}, got {}",
            cli.chunk_size
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.iou_threshold) {
        return Err(format!(
            "IoU threshold must be between 0.0 and 1.0, got {}",
            cli.iou_threshold
        )
        .into());
    }
    if cli.stats_interval <= 0.0 {
        return Err(format!(
            "Stats interval must be positive, got {}",
            cli.stats_interval
        )
        .into());
    }
    if cli.window == 0 {
        return Err("Performance window must be at least 1".into());
    }
    Ok(())
}
