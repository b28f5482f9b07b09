//! # framesource
//!
//! Frame-accurate, random-access video decoding: open a file once, then ask
//! for any frame by index, in any order, and get exactly that frame back.
//!
//! Decoding is sequential by nature, so serving random requests takes some
//! bookkeeping. `framesource` indexes the track once (and caches the index
//! next to the file), seeks the demuxer to the nearest preceding
//! random-access point, decodes forward while compensating for the decoder's
//! reordering delay, and converts the picture into the requested pixel
//! format. Nearby forward requests skip the seek, and repeated requests are
//! served from the decoder's last picture.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framesource::{PixelFormat, SourceOptions, VideoSource};
//!
//! let options = SourceOptions::new().with_format(PixelFormat::Rgb8);
//! let mut source = VideoSource::open_with_options("input.mp4", options)?;
//!
//! let frame = source.get_frame(1234)?;
//! println!(
//!     "{}x{}, picture type {}",
//!     frame.width(),
//!     frame.height(),
//!     frame.properties().picture_type
//! );
//! frame.to_image()?.save("frame_1234.png")?;
//! # Ok::<(), framesource::SourceError>(())
//! ```
//!
//! ## Host options
//!
//! ```no_run
//! use framesource::{SourceOptions, VideoSource};
//!
//! let options = SourceOptions::from_pairs([
//!     ("seek_mode", "1"),
//!     ("seek_threshold", "30"),
//!     ("variable", "1"),
//! ])?;
//! let source = VideoSource::open_with_options("input.ts", options)?;
//! # Ok::<(), framesource::SourceError>(())
//! ```
//!
//! ## Custom engines
//!
//! [`FrameSource`] is generic over the [`DecodeEngine`], the [`Materialize`]
//! step and the [`IndexProvider`]. [`VideoSource`] plugs in the FFmpeg
//! implementations; other demuxers or index sources can be used by
//! implementing the traits.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

mod conversion;
pub mod config;
pub mod delay;
pub mod demux;
pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod index;
pub mod indexer;
pub mod materialize;
pub mod metadata;
pub mod planner;
pub mod probe;
pub mod progress;
pub mod source;
pub mod video_source;

pub use config::{MediaCapability, ScalingQuality, SeekMode, SourceOptions};
pub use delay::{DecodeCursor, DelayTracker};
pub use demux::FfmpegEngine;
pub use engine::{DecodeEngine, DecodeStatus, SeekLanding, SeekRequest, SeekTarget};
pub use error::{ErrorKind, SourceError};
pub use ffmpeg::{
    FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level, sync_ffmpeg_log_level,
};
pub use frame::{
    ChromaLocation, ColorRange, ColorSpace, FrameProperties, PixelFormat, PlaneLayout,
    VideoFrame, picture_type_char,
};
pub use index::{AddressingMode, FrameIndex, IndexEntry, IndexProvider, NativeIndexRecord};
pub use indexer::{IndexCache, build_index};
pub use materialize::{FrameMaterializer, Materialize, OutputDescriptor};
pub use metadata::{AudioMetadata, SourceMetadata, VideoMetadata};
pub use planner::{SeekPlan, SeekPlanner};
pub use probe::{ProbeReport, ProbeState, StartupProber};
pub use progress::{ProgressCallback, ProgressInfo};
pub use source::{FrameSource, SourceStatistics};
pub use video_source::VideoSource;
