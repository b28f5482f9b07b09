//! Turning decoded pictures into output frames.
//!
//! [`FrameMaterializer`] converts the decoder's native picture into the
//! configured [`PixelFormat`] with FFmpeg's software scaler (no resizing),
//! composites it onto a fixed-size black background unless variable
//! dimensions were requested, and stamps the [`FrameProperties`].

use ffmpeg_next::{
    format::Pixel,
    frame::Video as FfmpegVideoFrame,
    software::scaling::Context as ScalingContext,
};
use ffmpeg_sys_next::{AV_FRAME_FLAG_INTERLACED, AVPixelFormat, sws_isSupportedInput, sws_isSupportedOutput};

use crate::{
    config::ScalingQuality,
    conversion::frame_to_planes,
    error::SourceError,
    frame::{
        ChromaLocation, ColorRange, ColorSpace, FrameProperties, PixelFormat, VideoFrame,
        picture_type_char,
    },
};

/// Converts a decoder picture of type `P` into a [`VideoFrame`].
pub trait Materialize<P> {
    /// Produce the output frame for `picture`.
    ///
    /// # Errors
    ///
    /// Returns an error if the picture cannot be converted. The caller treats
    /// such a picture as unusable.
    fn materialize(&mut self, picture: &P) -> Result<VideoFrame, SourceError>;

    /// The geometry and format every output frame is produced in.
    fn output(&self) -> OutputDescriptor;
}

/// Format and geometry of output frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub format: PixelFormat,
    /// Output width in fixed mode; the largest known width otherwise.
    pub width: u32,
    /// Output height in fixed mode; the largest known height otherwise.
    pub height: u32,
    /// Geometry follows each decoded picture.
    pub variable_dimensions: bool,
}

impl OutputDescriptor {
    /// Settle the output format for a decoder producing `native` pictures.
    ///
    /// A forced format wins; otherwise the format is derived from `native`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnsupportedFormat`] if there is no conversion
    /// path from `native` to the output format.
    pub fn resolve(
        native: Pixel,
        forced: Option<PixelFormat>,
        width: u32,
        height: u32,
        variable_dimensions: bool,
    ) -> Result<Self, SourceError> {
        let format = forced
            .or_else(|| PixelFormat::for_source(native))
            .ok_or_else(|| SourceError::UnsupportedFormat(format!("{native:?}")))?;

        // SAFETY: both calls only inspect static format tables.
        let supported = unsafe {
            sws_isSupportedInput(AVPixelFormat::from(native)) > 0
                && sws_isSupportedOutput(AVPixelFormat::from(format.to_ffmpeg_pixel())) > 0
        };
        if !supported {
            return Err(SourceError::UnsupportedFormat(format!(
                "{native:?} cannot be converted to {}",
                format.name()
            )));
        }

        Ok(Self {
            format,
            width,
            height,
            variable_dimensions,
        })
    }
}

/// Key of the cached scaler: input format and geometry.
type ScalerKey = (Pixel, u32, u32);

/// Production [`Materialize`] implementation over FFmpeg pictures.
pub struct FrameMaterializer {
    output: OutputDescriptor,
    background: Option<VideoFrame>,
    quality: ScalingQuality,
    duration: (i32, i32),
    scaler: Option<(ScalerKey, ScalingContext)>,
    converted: FfmpegVideoFrame,
}

impl FrameMaterializer {
    /// Create a materializer for `output`.
    ///
    /// `frame_rate` is the stream's fixed rate as `(numerator, denominator)`;
    /// every frame's duration is its reciprocal.
    pub fn new(output: OutputDescriptor, quality: ScalingQuality, frame_rate: (i32, i32)) -> Self {
        let background = (!output.variable_dimensions)
            .then(|| VideoFrame::black(output.format, output.width, output.height));
        let (numerator, denominator) = frame_rate;
        Self {
            output,
            background,
            quality,
            duration: (denominator, numerator),
            scaler: None,
            converted: FfmpegVideoFrame::empty(),
        }
    }

    fn convert(&mut self, picture: &FfmpegVideoFrame) -> Result<VideoFrame, SourceError> {
        let (width, height) = (picture.width(), picture.height());
        let key = (picture.format(), width, height);
        let target = self.output.format;

        let rebuild = self
            .scaler
            .as_ref()
            .is_none_or(|(current, _)| *current != key);
        if rebuild {
            log::debug!(
                "Configuring conversion {:?} {width}x{height} -> {}",
                key.0,
                target.name()
            );
            let scaler = ScalingContext::get(
                key.0,
                width,
                height,
                target.to_ffmpeg_pixel(),
                width,
                height,
                self.quality.to_scaling_flags(),
            )
            .map_err(|error| {
                SourceError::UnsupportedFormat(format!(
                    "{:?} cannot be converted to {}: {error}",
                    key.0,
                    target.name()
                ))
            })?;
            self.scaler = Some((key, scaler));
        }

        let Some((_, scaler)) = self.scaler.as_mut() else {
            return Err(SourceError::Setup("scaler was not configured".to_string()));
        };
        scaler.run(picture, &mut self.converted)?;
        frame_to_planes(&self.converted, target, width, height)
    }

    fn properties_of(&self, picture: &FfmpegVideoFrame) -> FrameProperties {
        // SAFETY: `picture` wraps a valid AVFrame; only plain fields are read.
        let raw = unsafe { &*picture.as_ptr() };
        FrameProperties {
            sample_aspect_ratio: (raw.sample_aspect_ratio.num, raw.sample_aspect_ratio.den),
            duration: self.duration,
            color_range: ColorRange::from_av_code(raw.color_range as i32),
            color_space: ColorSpace::from_code(raw.colorspace as i32),
            chroma_location: ChromaLocation::from_av_code(raw.chroma_location as i32),
            picture_type: picture_type_char(raw.pict_type as i32),
            interlaced: raw.flags & AV_FRAME_FLAG_INTERLACED as i32 != 0,
        }
    }
}

impl Materialize<FfmpegVideoFrame> for FrameMaterializer {
    fn materialize(&mut self, picture: &FfmpegVideoFrame) -> Result<VideoFrame, SourceError> {
        if picture.width() == 0 || picture.height() == 0 {
            return Err(SourceError::Conversion(
                "Decoded picture has no dimensions".to_string(),
            ));
        }

        let converted = self.convert(picture)?;
        let mut frame = match &self.background {
            Some(background) => {
                let mut frame = background.clone();
                frame.composite(&converted)?;
                frame
            }
            None => converted,
        };
        *frame.properties_mut() = self.properties_of(picture);
        Ok(frame)
    }

    fn output(&self) -> OutputDescriptor {
        self.output
    }
}
