//! Index construction and the on-disk index cache.
//!
//! [`build_index`] reads every packet of the container once, without
//! decoding, and records one [`IndexEntry`] per packet of the selected video
//! track. The result can be persisted with [`IndexCache`] so later opens of the
//! same file skip the scan.

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    ptr::{self, NonNull},
    sync::Arc,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, codec::context::Context as CodecContext, format::context::Input,
};
use ffmpeg_sys_next::{
    AV_NOPTS_VALUE, AVCodecID, AVCodecParserContext, AVFMT_NO_BYTE_SEEK, AVFMT_TS_DISCONT,
    PARSER_FLAG_COMPLETE_FRAMES, av_parser_close, av_parser_init, av_parser_parse2,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::SourceError,
    index::{AddressingMode, FrameIndex, IndexEntry},
    progress::{ProgressCallback, ProgressTracker},
};

/// Bumped whenever the cache layout or the meaning of an entry changes.
pub const INDEX_CACHE_VERSION: u32 = 2;

/// File extension appended to the source path for the default cache location.
pub const INDEX_CACHE_EXTENSION: &str = "fsindex";

/// Scan `input` and index every packet of stream `stream_index`.
///
/// `total_bytes` (the container size, if known) is only used for progress
/// percentages. The input is left at end of file.
///
/// # Errors
///
/// Returns [`SourceError::IndexBuild`] if the stream has no packets or the
/// demuxer fails mid-scan, and [`SourceError::NoVideoStream`] if the stream
/// does not exist.
pub fn build_index(
    input: &mut Input,
    stream_index: usize,
    total_bytes: Option<u64>,
    progress: Arc<dyn ProgressCallback>,
) -> Result<FrameIndex, SourceError> {
    log::debug!("Building frame index (stream={stream_index})");

    let (time_base, frame_rate, mut coded_sizes) = {
        let stream = input.stream(stream_index).ok_or(SourceError::NoVideoStream)?;
        let time_base = stream.time_base();
        let average = stream.avg_frame_rate();
        let frame_rate = if average.numerator() > 0 && average.denominator() > 0 {
            average
        } else {
            stream.rate()
        };
        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| {
                SourceError::IndexBuild(format!(
                    "Failed to read codec parameters for stream {stream_index}: {error}"
                ))
            })?;
        let mut coded_sizes = CodedSizeTracker::new(decoder.width(), decoder.height());
        match CodecContext::from_parameters(stream.parameters()) {
            Ok(context) => coded_sizes.attach_parser(stream.parameters().id(), context),
            Err(error) => log::debug!("No parser context for stream {stream_index}: {error}"),
        }
        (time_base, frame_rate, coded_sizes)
    };

    let (timestamp_discontinuities, byte_seek_supported) = {
        // SAFETY: an opened input context always has a valid `iformat`.
        let flags = unsafe { (*(*input.as_ptr()).iformat).flags };
        (
            flags & AVFMT_TS_DISCONT as i32 != 0,
            flags & AVFMT_NO_BYTE_SEEK as i32 == 0,
        )
    };

    let mut tracker = ProgressTracker::new(progress, total_bytes);
    let mut entries: Vec<IndexEntry> = Vec::new();
    let mut packet = Packet::empty();
    loop {
        match packet.read(input) {
            Ok(()) => {
                if packet.stream() != stream_index {
                    continue;
                }
                let position = packet.position();
                let byte_position = (position >= 0).then_some(position as i64);
                entries.push(IndexEntry {
                    byte_position,
                    timestamp: packet.dts().or(packet.pts()),
                    presentation_timestamp: packet.pts(),
                    size: u32::try_from(packet.size()).unwrap_or(u32::MAX),
                    random_access: packet.is_key(),
                });
                coded_sizes.observe(&packet);
                tracker.advance(byte_position.map(|position| position as u64 + packet.size() as u64));
            }
            Err(FfmpegError::Eof) => break,
            Err(error) => {
                return Err(SourceError::IndexBuild(format!(
                    "Demuxing failed after {} packets: {error}",
                    entries.len()
                )));
            }
        }
    }
    tracker.finish();

    if entries.is_empty() {
        return Err(SourceError::IndexBuild(format!(
            "Stream {stream_index} contains no packets"
        )));
    }
    if !entries.iter().any(|entry| entry.random_access) {
        log::warn!("Stream {stream_index} has no packets flagged as random access; treating the first as one");
        entries[0].random_access = true;
    }

    let addressing = AddressingMode::choose(
        timestamp_discontinuities,
        byte_seek_supported,
        entries.iter().all(|entry| entry.byte_position.is_some()),
        entries.iter().all(|entry| entry.timestamp.is_some()),
    );

    let (rate_numerator, rate_denominator) = if frame_rate.numerator() > 0 && frame_rate.denominator() > 0 {
        (frame_rate.numerator(), frame_rate.denominator())
    } else {
        log::warn!("Stream {stream_index} has no usable frame rate; assuming 25 fps");
        (25, 1)
    };

    let (max_width, max_height) = coded_sizes.max_dimensions();
    log::info!(
        "Indexed {} frames ({} random access points, {:?} addressing, up to {max_width}x{max_height})",
        entries.len(),
        entries.iter().filter(|entry| entry.random_access).count(),
        addressing
    );

    Ok(FrameIndex::new(entries)
        .with_stream_index(stream_index)
        .with_addressing(addressing)
        .with_max_dimensions(max_width, max_height)
        .with_frame_rate(rate_numerator, rate_denominator)
        .with_time_base(time_base.numerator(), time_base.denominator()))
}

/// Largest picture size seen in a track.
///
/// Starts from the codec parameters and, when FFmpeg has a parser for the
/// codec, grows with the size each packet's headers announce. Streams that
/// change resolution mid-way are only sized correctly this way.
struct CodedSizeTracker {
    max_width: u32,
    max_height: u32,
    parser: Option<PacketParser>,
}

impl CodedSizeTracker {
    fn new(width: u32, height: u32) -> Self {
        Self {
            max_width: width,
            max_height: height,
            parser: None,
        }
    }

    fn attach_parser(&mut self, codec: ffmpeg_next::codec::Id, context: CodecContext) {
        self.parser = PacketParser::new(codec, context);
        if self.parser.is_none() {
            log::debug!("No parser for {codec:?}; picture size comes from codec parameters only");
        }
    }

    fn observe(&mut self, packet: &Packet) {
        let Some((width, height)) = self.parser.as_mut().and_then(|parser| parser.parse(packet))
        else {
            return;
        };
        if width > self.max_width || height > self.max_height {
            log::trace!("Picture size grows to {width}x{height}");
        }
        self.grow(width, height);
    }

    fn grow(&mut self, width: u32, height: u32) {
        self.max_width = self.max_width.max(width);
        self.max_height = self.max_height.max(height);
    }

    fn max_dimensions(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }
}

/// An FFmpeg bitstream parser fed one complete packet at a time.
struct PacketParser {
    parser: NonNull<AVCodecParserContext>,
    context: CodecContext,
}

impl PacketParser {
    fn new(codec: ffmpeg_next::codec::Id, context: CodecContext) -> Option<Self> {
        // SAFETY: `av_parser_init` returns a fresh parser or null.
        let parser = NonNull::new(unsafe { av_parser_init(AVCodecID::from(codec) as i32) })?;
        // SAFETY: the parser was just allocated and is exclusively owned here.
        unsafe { (*parser.as_ptr()).flags |= PARSER_FLAG_COMPLETE_FRAMES as i32 };
        Some(Self { parser, context })
    }

    /// Parse `packet` and return the picture size its headers announce.
    fn parse(&mut self, packet: &Packet) -> Option<(u32, u32)> {
        let data = packet.data()?;
        let size = i32::try_from(data.len()).ok()?;
        let mut output: *mut u8 = ptr::null_mut();
        let mut output_size = 0;
        // SAFETY: `data` outlives the call, the parser and context are owned
        // by `self`, and the output buffer is only borrowed until the next
        // parse.
        let consumed = unsafe {
            av_parser_parse2(
                self.parser.as_ptr(),
                self.context.as_mut_ptr(),
                &mut output,
                &mut output_size,
                data.as_ptr(),
                size,
                packet.pts().unwrap_or(AV_NOPTS_VALUE),
                packet.dts().unwrap_or(AV_NOPTS_VALUE),
                packet.position() as i64,
            )
        };
        if consumed < 0 {
            return None;
        }
        // SAFETY: plain field reads on the owned parser.
        let (width, height) = unsafe {
            let parser = &*self.parser.as_ptr();
            (parser.width, parser.height)
        };
        Some((u32::try_from(width).ok()?, u32::try_from(height).ok()?))
    }
}

impl Drop for PacketParser {
    fn drop(&mut self) {
        // SAFETY: the parser is owned by `self` and closed exactly once.
        unsafe { av_parser_close(self.parser.as_ptr()) };
    }
}

#[derive(Serialize, Deserialize)]
struct IndexCacheFile {
    version: u32,
    source_size: u64,
    stream_index: usize,
    index: FrameIndex,
}

/// A JSON file holding a previously built [`FrameIndex`].
///
/// A cached index is only reused if it was written by the same cache version,
/// for the same stream, from a source file of the same size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCache {
    path: PathBuf,
}

impl IndexCache {
    /// The default cache location for `source`: `<source>.fsindex`.
    pub fn for_source<P: AsRef<Path>>(source: P) -> Self {
        let mut name: OsString = source.as_ref().as_os_str().to_owned();
        name.push(".");
        name.push(INDEX_CACHE_EXTENSION);
        Self {
            path: PathBuf::from(name),
        }
    }

    /// A cache stored at an explicit path.
    pub fn at<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached index if it exists and matches the source.
    ///
    /// Returns `Ok(None)` for a missing, stale or unreadable cache; such a
    /// cache is simply rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::IoError`] if the file exists but cannot be
    /// opened.
    pub fn load(
        &self,
        source_size: u64,
        stream_index: Option<usize>,
    ) -> Result<Option<FrameIndex>, SourceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let cached: IndexCacheFile = match serde_json::from_reader(reader) {
            Ok(cached) => cached,
            Err(error) => {
                log::warn!("Ignoring unreadable index cache {}: {error}", self.path.display());
                return Ok(None);
            }
        };

        if cached.version != INDEX_CACHE_VERSION {
            log::debug!(
                "Index cache version {} does not match {INDEX_CACHE_VERSION}",
                cached.version
            );
            return Ok(None);
        }
        if cached.source_size != source_size {
            log::debug!("Index cache was written for a different file size");
            return Ok(None);
        }
        if stream_index.is_some_and(|index| index != cached.stream_index)
            || cached.index.stream_index() != cached.stream_index
        {
            log::debug!("Index cache was written for stream {}", cached.stream_index);
            return Ok(None);
        }

        let mut index = cached.index;
        index.rebuild_lookup();
        if index.random_access_points().is_empty() {
            return Ok(None);
        }
        log::debug!("Loaded index cache {}", self.path.display());
        Ok(Some(index))
    }

    /// Write `index` to the cache file, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::IoError`] or [`SourceError::IndexCache`] if the
    /// file cannot be written.
    pub fn store(&self, index: &FrameIndex, source_size: u64) -> Result<(), SourceError> {
        let cached = IndexCacheFile {
            version: INDEX_CACHE_VERSION,
            source_size,
            stream_index: index.stream_index(),
            index: index.clone(),
        };
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(&mut writer, &cached)?;
        writer.flush()?;
        log::debug!("Wrote index cache {}", self.path.display());
        Ok(())
    }

    /// Delete the cache file if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::IoError`] if the file exists but cannot be
    /// removed.
    pub fn remove(&self) -> Result<(), SourceError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
