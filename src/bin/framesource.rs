use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framesource::{
    FfmpegLogLevel, FrameProperties, IndexProvider, MediaCapability, PixelFormat,
    ProgressCallback, ProgressInfo, ScalingQuality, SeekMode, SourceOptions, VideoSource,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framesource info input.mp4 --json\n  framesource frame input.mp4 1234 --out frame.png\n  framesource dump input.ts --out frames --frames 0-99 --order reverse --progress\n  framesource props input.mkv --frames 0,10,20 --json\n  framesource completions zsh > _framesource";

#[derive(Debug, Parser)]
#[command(
    name = "framesource",
    version,
    about = "Frame-accurate random access into video files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional output (per-frame messages, source statistics).
    #[arg(long, global = true)]
    verbose: bool,

    /// Show progress bars for indexing and frame dumps.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output pixel format (e.g. rgb24, rgba, gray8, yuv420p8, yuv444p16).
    #[arg(long, global = true)]
    format: Option<String>,

    /// Container stream index of the video track.
    #[arg(long, global = true)]
    stream_index: Option<usize>,

    /// Decoder thread count (0 = automatic).
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Seek recovery mode (normal, unsafe, aggressive or 0-2).
    #[arg(long, global = true)]
    seek_mode: Option<String>,

    /// Forward-decode window in frames (1-999).
    #[arg(long, global = true)]
    seek_threshold: Option<u32>,

    /// Let frame geometry follow each decoded picture.
    #[arg(long, global = true)]
    variable: bool,

    /// Conversion quality (fast-bilinear, bilinear, bicubic, lanczos).
    #[arg(long, global = true)]
    scaling: Option<String>,

    /// Do not read or write the on-disk index cache.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Location of the index cache file.
    #[arg(long, global = true)]
    index_cache: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print track, index and decoder information.
    #[command(
        about = "Print source information",
        visible_alias = "probe",
        after_help = "Examples:\n  framesource info input.mp4\n  framesource info input.mp4 --json"
    )]
    Info {
        /// Input media path.
        input: PathBuf,

        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Save a single frame as an image.
    #[command(
        about = "Save one frame",
        after_help = "Examples:\n  framesource frame input.mp4 0 --out first.png\n  framesource frame input.mp4 5000 --out far.jpg --format rgb24"
    )]
    Frame {
        /// Input media path.
        input: PathBuf,
        /// 0-based frame index.
        frame: i64,
        /// Output image path.
        #[arg(long)]
        out: PathBuf,
    },

    /// Save a list of frames to a directory, in the requested order.
    #[command(
        about = "Save many frames",
        after_help = "Examples:\n  framesource dump input.mp4 --out frames --frames 0-99\n  framesource dump input.mp4 --out frames --frames 500,3,42 --order given --ext jpg"
    )]
    Dump {
        /// Input media path.
        input: PathBuf,
        /// Output directory.
        #[arg(long)]
        out: PathBuf,
        /// Frame list such as `0-99`, `5,10,15` or `0-9,100-109`. Defaults to all frames.
        #[arg(long)]
        frames: Option<String>,
        /// Request order: given, reverse or interleaved.
        #[arg(long, default_value = "given")]
        order: String,
        /// Output image extension (png, jpg, jpeg, bmp, tiff).
        #[arg(long, default_value = "png")]
        ext: String,
    },

    /// Print per-frame properties.
    #[command(
        about = "Print frame properties",
        after_help = "Examples:\n  framesource props input.mp4 --frames 0-9\n  framesource props input.mp4 --frames 0,100 --json"
    )]
    Props {
        /// Input media path.
        input: PathBuf,
        /// Frame list such as `0-9` or `0,100`.
        #[arg(long, default_value = "0")]
        frames: String,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Order in which the `dump` command issues requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestOrder {
    Given,
    Reverse,
    /// First, last, second, second to last, ...
    Interleaved,
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "panic" => Some(FfmpegLogLevel::Panic),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "verbose" => Some(FfmpegLogLevel::Verbose),
        "debug" => Some(FfmpegLogLevel::Debug),
        "trace" => Some(FfmpegLogLevel::Trace),
        _ => None,
    }
}

fn parse_seek_mode(value: &str) -> Option<SeekMode> {
    match value.to_ascii_lowercase().as_str() {
        "normal" => Some(SeekMode::Normal),
        "unsafe" => Some(SeekMode::Unsafe),
        "aggressive" => Some(SeekMode::Aggressive),
        other => other.parse::<i64>().ok().map(SeekMode::from_level),
    }
}

fn parse_scaling(value: &str) -> Option<ScalingQuality> {
    match value.to_ascii_lowercase().as_str() {
        "fast-bilinear" | "fast_bilinear" | "fast" => Some(ScalingQuality::FastBilinear),
        "bilinear" => Some(ScalingQuality::Bilinear),
        "bicubic" => Some(ScalingQuality::Bicubic),
        "lanczos" => Some(ScalingQuality::Lanczos),
        _ => None,
    }
}

fn parse_order(value: &str) -> Option<RequestOrder> {
    match value.to_ascii_lowercase().as_str() {
        "given" | "forward" => Some(RequestOrder::Given),
        "reverse" | "backward" => Some(RequestOrder::Reverse),
        "interleaved" | "zigzag" => Some(RequestOrder::Interleaved),
        _ => None,
    }
}

/// Parse a frame list like `0-9,20,30-32`. Ranges are inclusive.
fn parse_frame_list(value: &str) -> Result<Vec<i64>, Box<dyn std::error::Error>> {
    let mut frames = Vec::new();
    for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = start.trim().parse::<i64>()?;
                let end = end.trim().parse::<i64>()?;
                if start > end {
                    return Err(format!("invalid frame range: {part}").into());
                }
                frames.extend(start..=end);
            }
            None => frames.push(part.parse::<i64>()?),
        }
    }
    if frames.is_empty() {
        return Err("frame list cannot be empty".into());
    }
    Ok(frames)
}

fn apply_order(mut frames: Vec<i64>, order: RequestOrder) -> Vec<i64> {
    match order {
        RequestOrder::Given => frames,
        RequestOrder::Reverse => {
            frames.reverse();
            frames
        }
        RequestOrder::Interleaved => {
            let mut ordered = Vec::with_capacity(frames.len());
            let (mut low, mut high) = (0, frames.len());
            while low < high {
                ordered.push(frames[low]);
                low += 1;
                if low < high {
                    high -= 1;
                    ordered.push(frames[high]);
                }
            }
            ordered
        }
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Build source options from the global flags. `image_output` forces an RGB
/// format when none was given, since planar YUV cannot be saved as an image.
fn source_options(
    global: &GlobalOptions,
    image_output: bool,
) -> Result<SourceOptions, Box<dyn std::error::Error>> {
    let mut options = SourceOptions::new()
        .with_cache_index(!global.no_cache)
        .with_variable_dimensions(global.variable)
        .with_capability(MediaCapability::VideoAndAudio);

    if let Some(stream_index) = global.stream_index {
        options = options.with_stream_index(stream_index);
    }
    if let Some(threads) = global.threads {
        options = options.with_threads(threads);
    }
    if let Some(mode) = &global.seek_mode {
        let mode = parse_seek_mode(mode).ok_or(format!("unsupported --seek-mode: {mode}"))?;
        options = options.with_seek_mode(mode);
    }
    if let Some(threshold) = global.seek_threshold {
        options = options.with_seek_threshold(threshold);
    }
    if let Some(scaling) = &global.scaling {
        let quality = parse_scaling(scaling).ok_or(format!("unsupported --scaling: {scaling}"))?;
        options = options.with_scaling(quality);
    }
    if let Some(path) = &global.index_cache {
        options = options.with_index_cache_path(path);
    }
    match &global.format {
        Some(name) => {
            let format =
                PixelFormat::from_name(name).ok_or(format!("unsupported --format: {name}"))?;
            options = options.with_format(format);
        }
        None if image_output => options = options.with_format(PixelFormat::Rgb8),
        None => {}
    }
    if global.progress {
        options = options.with_progress(Arc::new(IndexingProgress::new()?));
    }
    Ok(options)
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    match &global.log_level {
        Some(level) => {
            let parsed =
                parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
            framesource::set_ffmpeg_log_level(parsed);
        }
        // Seeking makes decoders complain about missing references.
        None if !global.verbose => framesource::set_ffmpeg_log_level(FfmpegLogLevel::Error),
        None => {}
    }
    Ok(())
}

/// Index-construction progress rendered as a byte progress bar.
struct IndexingProgress {
    bar: ProgressBar,
}

impl IndexingProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "indexing {spinner:.green} {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for IndexingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        self.bar.set_message(format!("{} packets", info.frames_indexed));
        if info.total.is_some_and(|total| info.current >= total) {
            self.bar.finish_and_clear();
        }
    }
}

fn properties_json(n: i64, properties: &FrameProperties) -> serde_json::Value {
    json!({
        "frame": n,
        "sar": [properties.sample_aspect_ratio.0, properties.sample_aspect_ratio.1],
        "duration": [properties.duration.0, properties.duration.1],
        "color_range": if properties.color_range.is_limited() { "limited" } else { "full" },
        "color_space": properties.color_space.code(),
        "chroma_location": properties.chroma_location.map(|location| location.code()),
        "picture_type": properties.picture_type.to_string(),
        "interlaced": properties.interlaced,
    })
}

fn print_statistics(source: &VideoSource) {
    let statistics = source.statistics();
    eprintln!(
        "{} {} requests, {} seeks, {} decode attempts, {} cached",
        "stats:".cyan().bold(),
        statistics.requests,
        statistics.seeks,
        statistics.decode_attempts,
        statistics.cached_frames
    );
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Info { input, json } => {
            let source = VideoSource::open_with_options(&input, source_options(&cli.global, false)?)?;
            let metadata = source.metadata();
            let video = &metadata.video;
            let output = source.output();
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "file_size": metadata.file_size,
                    "video": {
                        "stream_index": video.stream_index,
                        "width": video.width,
                        "height": video.height,
                        "frame_rate": [video.frame_rate.0, video.frame_rate.1],
                        "fps": video.frames_per_second,
                        "frame_count": video.frame_count,
                        "random_access_points": video.random_access_points,
                        "codec": video.codec,
                        "pixel_format": video.pixel_format_name,
                    },
                    "audio": metadata.audio.as_ref().map(|audio| json!({
                        "stream_index": audio.stream_index,
                        "sample_rate": audio.sample_rate,
                        "channels": audio.channels,
                        "codec": audio.codec,
                        "bit_rate": audio.bit_rate,
                    })),
                    "output": {
                        "format": output.format.name(),
                        "width": output.width,
                        "height": output.height,
                        "variable": output.variable_dimensions,
                    },
                    "addressing": format!("{:?}", source.index().addressing()),
                    "decoder_delay": source.delay(),
                    "first_valid_frame": source.first_valid_frame(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Video: stream {} {}x{} @ {:.3} fps [{}], {} frames, {} random access points",
                    video.stream_index,
                    video.width,
                    video.height,
                    video.frames_per_second,
                    video.codec,
                    video.frame_count,
                    video.random_access_points
                );
                if let Some(audio) = &metadata.audio {
                    println!(
                        "Audio: stream {} {} Hz, {} ch [{}]",
                        audio.stream_index, audio.sample_rate, audio.channels, audio.codec,
                    );
                }
                println!(
                    "Output: {} {}x{}{}",
                    output.format.name(),
                    output.width,
                    output.height,
                    if output.variable_dimensions { " (variable)" } else { "" }
                );
                println!(
                    "Seeking: {:?} addressing, decoder delay {}, first valid frame {}",
                    source.index().addressing(),
                    source.delay(),
                    source.first_valid_frame()
                );
            }
        }
        Commands::Frame { input, frame, out } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let mut source =
                VideoSource::open_with_options(&input, source_options(&cli.global, true)?)?;
            let image = source.get_frame(frame)?.to_image()?;
            image.save(&out)?;
            println!("{} {}", "saved".green().bold(), out.display());
            if cli.global.verbose {
                print_statistics(&source);
            }
        }
        Commands::Dump {
            input,
            out,
            frames,
            order,
            ext,
        } => {
            let order = parse_order(&order).ok_or(format!("unsupported --order: {order}"))?;
            if out.exists() && !cli.global.overwrite {
                return Err(format!(
                    "output directory already exists: {} (use --overwrite)",
                    out.display()
                )
                .into());
            }
            fs::create_dir_all(&out)?;

            let mut source =
                VideoSource::open_with_options(&input, source_options(&cli.global, true)?)?;
            let frames = match frames {
                Some(list) => parse_frame_list(&list)?,
                None => (0..i64::from(source.frame_count())).collect(),
            };
            let frames = apply_order(frames, order);
            let ext_clean = ext.trim_start_matches('.').to_ascii_lowercase();

            let progress_bar = if cli.global.progress {
                let pb = ProgressBar::new(frames.len() as u64);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
                )?;
                pb.set_style(style.progress_chars("##-"));
                Some(pb)
            } else {
                None
            };

            let mut saved = 0_u64;
            for n in frames {
                let output_path = out.join(format!("frame_{n:06}.{ext_clean}"));
                if output_path.exists() && !cli.global.overwrite {
                    return Err(format!(
                        "output file already exists: {} (use --overwrite)",
                        output_path.display()
                    )
                    .into());
                }

                source.get_frame(n)?.to_image()?.save(&output_path)?;
                saved += 1;

                if let Some(pb) = &progress_bar {
                    pb.inc(1);
                }
                if cli.global.verbose {
                    eprintln!("saved frame {n} -> {}", output_path.display());
                }
            }

            if let Some(pb) = progress_bar {
                pb.finish_with_message("done");
            }
            if source.is_failed() {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    "decoding failed part way; later frames are black".yellow()
                );
            }
            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Saved {saved} frame(s) to {}", out.display()).green()
            );
            if cli.global.verbose {
                print_statistics(&source);
            }
        }
        Commands::Props {
            input,
            frames,
            json,
        } => {
            let mut source =
                VideoSource::open_with_options(&input, source_options(&cli.global, false)?)?;
            let frames = parse_frame_list(&frames)?;
            let mut payload = Vec::with_capacity(frames.len());
            for n in frames {
                let frame = source.get_frame(n)?;
                let properties = frame.properties();
                if json {
                    payload.push(properties_json(n, properties));
                } else {
                    println!(
                        "frame {n}: {} SAR {}:{} {} range, matrix {}, {}",
                        properties.picture_type,
                        properties.sample_aspect_ratio.0,
                        properties.sample_aspect_ratio.1,
                        if properties.color_range.is_limited() { "limited" } else { "full" },
                        properties.color_space.code(),
                        if properties.interlaced { "interlaced" } else { "progressive" }
                    );
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framesource", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        RequestOrder, apply_order, parse_frame_list, parse_order, parse_scaling, parse_seek_mode,
    };
    use framesource::{ScalingQuality, SeekMode};

    #[test]
    fn parse_frame_list_ranges_and_singles() {
        assert_eq!(parse_frame_list("3").unwrap(), vec![3]);
        assert_eq!(parse_frame_list("0-3").unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(parse_frame_list("5, 1-2 ,9").unwrap(), vec![5, 1, 2, 9]);
        assert!(parse_frame_list("4-2").is_err());
        assert!(parse_frame_list("").is_err());
        assert!(parse_frame_list("a-b").is_err());
    }

    #[test]
    fn parse_seek_mode_names_and_levels() {
        assert_eq!(parse_seek_mode("normal"), Some(SeekMode::Normal));
        assert_eq!(parse_seek_mode("UNSAFE"), Some(SeekMode::Unsafe));
        assert_eq!(parse_seek_mode("2"), Some(SeekMode::Aggressive));
        assert_eq!(parse_seek_mode("7"), Some(SeekMode::Aggressive));
        assert_eq!(parse_seek_mode("fast"), None);
    }

    #[test]
    fn parse_scaling_aliases() {
        assert_eq!(parse_scaling("fast"), Some(ScalingQuality::FastBilinear));
        assert_eq!(parse_scaling("Lanczos"), Some(ScalingQuality::Lanczos));
        assert_eq!(parse_scaling("nearest"), None);
    }

    #[test]
    fn request_orders() {
        assert_eq!(parse_order("zigzag"), Some(RequestOrder::Interleaved));
        assert_eq!(apply_order(vec![0, 1, 2, 3], RequestOrder::Reverse), vec![3, 2, 1, 0]);
        assert_eq!(
            apply_order(vec![0, 1, 2, 3, 4], RequestOrder::Interleaved),
            vec![0, 4, 1, 3, 2]
        );
    }
}
