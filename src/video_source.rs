//! Core [`VideoSource`] implementation.
//!
//! `VideoSource` is the main entry point for the crate. It opens a media
//! file, selects the video track, builds (or reloads) the frame index, sets
//! up the FFmpeg engine and materializer, and runs the startup probe. After
//! that, any frame can be requested by index in any order.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::{
    config::{MediaCapability, SourceOptions},
    conversion::{frame_number_to_duration, rational_to_f64, timestamp_to_seconds},
    demux::FfmpegEngine,
    error::SourceError,
    frame::VideoFrame,
    index::{FrameIndex, IndexProvider},
    indexer::{IndexCache, build_index},
    materialize::{FrameMaterializer, OutputDescriptor},
    metadata::{AudioMetadata, SourceMetadata, VideoMetadata},
    planner::SeekPlanner,
    source::{FrameSource, SourceStatistics},
};

/// A frame-accurate video source backed by FFmpeg.
///
/// # Example
///
/// ```no_run
/// use framesource::{PixelFormat, SourceOptions, VideoSource};
///
/// let options = SourceOptions::new().with_format(PixelFormat::Rgb8);
/// let mut source = VideoSource::open_with_options("input.mp4", options)?;
///
/// // Frames can be requested in any order.
/// let last = source.get_frame(i64::from(source.frame_count()) - 1)?;
/// let first = source.get_frame(0)?;
/// first.to_image()?.save("first.png")?;
/// # let _ = last;
/// # Ok::<(), framesource::SourceError>(())
/// ```
pub struct VideoSource {
    source: FrameSource<FfmpegEngine, FrameMaterializer, FrameIndex>,
    metadata: SourceMetadata,
    options: SourceOptions,
    path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("options", &self.options)
            .field("output", &self.source.output())
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a media file with default options.
    ///
    /// # Errors
    ///
    /// See [`open_with_options`](Self::open_with_options).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        Self::open_with_options(path, SourceOptions::default())
    }

    /// Open a media file.
    ///
    /// Initializes FFmpeg (idempotent), selects the video track, loads the
    /// index cache or scans the file, opens the decoder and probes the
    /// decoder delay.
    ///
    /// # Errors
    ///
    /// Returns a setup error ([`SourceError::is_setup_error`]) if any step
    /// fails: the file cannot be opened, has no (or the wrong) video track,
    /// cannot be indexed, or yields no decodable picture. Returns
    /// [`SourceError::UnsupportedFormat`] if the decoded pixel format cannot
    /// be converted to the output format.
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        options: SourceOptions,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video source: {}", path.display());

        ffmpeg_next::init().map_err(|error| SourceError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let mut input = ffmpeg_next::format::input(&path).map_err(|error| SourceError::FileOpen {
            path: path.clone(),
            reason: error.to_string(),
        })?;
        let stream_index = select_video_stream(&input, options.stream_index)?;
        let file_size = fs::metadata(&path)?.len();

        let mut metadata = read_metadata(&input, &path, stream_index, file_size, options.capability)?;
        let index = load_or_build_index(&mut input, &path, stream_index, file_size, &options)?;
        drop(input);

        metadata.video.frame_count = index.frame_count();
        metadata.video.random_access_points = index.random_access_points().len();
        if metadata.video.frame_rate.1 == 0 {
            let (numerator, denominator) = index.frame_rate();
            metadata.video.frame_rate = (numerator, denominator);
            metadata.video.frames_per_second = numerator as f64 / denominator.max(1) as f64;
        }

        let engine = FfmpegEngine::open(
            &path,
            stream_index,
            options.threads,
            options.seek_mode.tolerates_decode_errors(),
        )?;

        let (width, height) = match index.max_dimensions() {
            (0, _) | (_, 0) => engine.dimensions(),
            dimensions => dimensions,
        };
        let output = OutputDescriptor::resolve(
            engine.pixel_format(),
            options.format,
            width,
            height,
            options.variable_dimensions,
        )?;
        log::debug!(
            "Output {} {}x{}{}",
            output.format.name(),
            output.width,
            output.height,
            if output.variable_dimensions { " (variable)" } else { "" }
        );
        let materializer = FrameMaterializer::new(output, options.scaling, index.frame_rate());

        let source = FrameSource::new(
            engine,
            materializer,
            index,
            SeekPlanner::new(options.seek_threshold),
            options.seek_mode,
        )?;

        log::info!(
            "Opened {} ({} frames, stream {stream_index})",
            path.display(),
            source.frame_count()
        );

        Ok(Self {
            source,
            metadata,
            options,
            path,
        })
    }

    /// Return the frame at 0-based index `n`.
    ///
    /// # Errors
    ///
    /// See [`FrameSource::get_frame`].
    pub fn get_frame(&mut self, n: i64) -> Result<VideoFrame, SourceError> {
        self.source.get_frame(n)
    }

    /// Number of frames in the selected track.
    pub fn frame_count(&self) -> u32 {
        self.source.frame_count()
    }

    /// Cached metadata.
    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// Format and geometry of returned frames.
    pub fn output(&self) -> OutputDescriptor {
        self.source.output()
    }

    /// The options this source was opened with.
    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    /// Path of the opened file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The frame index.
    pub fn index(&self) -> &FrameIndex {
        self.source.index()
    }

    /// Decoder delay established at startup, in frames.
    pub fn delay(&self) -> u32 {
        self.source.delay()
    }

    /// 0-based index of the first frame a decode run can produce.
    pub fn first_valid_frame(&self) -> u32 {
        self.source.first_valid_frame() - 1
    }

    /// Returns `true` once a decode error has made the source terminal.
    pub fn is_failed(&self) -> bool {
        self.source.is_failed()
    }

    pub fn statistics(&self) -> SourceStatistics {
        self.source.statistics()
    }

    /// Nominal time of 0-based frame `n` at the track's fixed frame rate.
    pub fn frame_time(&self, n: u32) -> Duration {
        frame_number_to_duration(u64::from(n), self.index().frame_rate())
    }

    /// Presentation time of 0-based frame `n` in seconds, taken from its
    /// packet, if the container recorded one.
    pub fn presentation_time(&self, n: u32) -> Option<f64> {
        let index = self.index();
        let timestamp = index.entry(n.checked_add(1)?)?.presentation_timestamp?;
        Some(timestamp_to_seconds(timestamp, index.time_base()))
    }
}

/// Validate the configured track or pick the best video stream.
fn select_video_stream(input: &Input, configured: Option<usize>) -> Result<usize, SourceError> {
    match configured {
        Some(stream_index) => input
            .stream(stream_index)
            .filter(|stream| stream.parameters().medium() == Type::Video)
            .map(|stream| stream.index())
            .ok_or(SourceError::VideoTrackOutOfRange {
                stream_index,
                stream_count: input.nb_streams() as usize,
            }),
        None => input
            .streams()
            .best(Type::Video)
            .map(|stream| stream.index())
            .ok_or(SourceError::NoVideoStream),
    }
}

fn load_or_build_index(
    input: &mut Input,
    path: &Path,
    stream_index: usize,
    file_size: u64,
    options: &SourceOptions,
) -> Result<FrameIndex, SourceError> {
    let cache = options
        .cache_index
        .then(|| match &options.index_cache_path {
            Some(cache_path) => IndexCache::at(cache_path),
            None => IndexCache::for_source(path),
        });

    if let Some(cache) = &cache {
        match cache.load(file_size, Some(stream_index)) {
            Ok(Some(index)) => return Ok(index),
            Ok(None) => {}
            Err(error) => log::warn!("Index cache {} unusable: {error}", cache.path().display()),
        }
    }

    let index = build_index(input, stream_index, Some(file_size), options.progress.clone())?;

    if let Some(cache) = &cache {
        if let Err(error) = cache.store(&index, file_size) {
            log::warn!("Failed to write index cache {}: {error}", cache.path().display());
        }
    }
    Ok(index)
}

fn read_metadata(
    input: &Input,
    path: &Path,
    stream_index: usize,
    file_size: u64,
    capability: MediaCapability,
) -> Result<SourceMetadata, SourceError> {
    let format = input.format().name().to_string();
    let duration_microseconds = input.duration();
    let duration = if duration_microseconds > 0 {
        Duration::from_micros(duration_microseconds as u64)
    } else {
        Duration::ZERO
    };

    let stream = input.stream(stream_index).ok_or(SourceError::NoVideoStream)?;
    let video_decoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().video())
        .map_err(|error| SourceError::FileOpen {
            path: path.to_path_buf(),
            reason: format!("Failed to create video decoder for stream {stream_index}: {error}"),
        })?;

    let average = stream.avg_frame_rate();
    let frame_rate = if average.numerator() > 0 && average.denominator() > 0 {
        average
    } else {
        stream.rate()
    };
    let codec = video_decoder
        .codec()
        .map(|codec| codec.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let pixel_format_name = {
        let name = format!("{:?}", video_decoder.format());
        if name == "None" { None } else { Some(name) }
    };

    let video = VideoMetadata {
        stream_index,
        width: video_decoder.width(),
        height: video_decoder.height(),
        frame_rate: (frame_rate.numerator(), frame_rate.denominator()),
        frames_per_second: rational_to_f64(frame_rate).unwrap_or(0.0),
        frame_count: 0,
        random_access_points: 0,
        codec,
        pixel_format_name,
    };

    let audio = match capability {
        MediaCapability::VideoOnly => None,
        MediaCapability::VideoAndAudio => read_audio_metadata(input),
    };

    Ok(SourceMetadata {
        video,
        audio,
        duration,
        format,
        file_size,
    })
}

/// Metadata of the best audio stream. A stream whose decoder cannot be
/// created is reported as absent.
fn read_audio_metadata(input: &Input) -> Option<AudioMetadata> {
    let stream = input.streams().best(Type::Audio)?;
    let audio_decoder = match CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().audio())
    {
        Ok(decoder) => decoder,
        Err(error) => {
            log::warn!("Ignoring audio stream {}: {error}", stream.index());
            return None;
        }
    };
    Some(AudioMetadata {
        stream_index: stream.index(),
        sample_rate: audio_decoder.rate(),
        channels: audio_decoder.channels(),
        codec: audio_decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        bit_rate: audio_decoder.bit_rate() as u64,
    })
}
