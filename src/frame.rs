//! Output frames and per-frame properties.
//!
//! A [`VideoFrame`] is what the consumer receives from
//! [`FrameSource::get_frame`](crate::FrameSource::get_frame): tightly packed
//! planes in one of the supported [`PixelFormat`]s plus a
//! [`FrameProperties`] record describing aspect ratio, timing and colour
//! metadata.

use ffmpeg_next::format::Pixel;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage, RgbaImage};

use crate::error::SourceError;

/// Output pixel format of materialized frames.
///
/// Planar YUV formats keep the decoder's native layout; packed RGB and gray
/// formats can be turned into [`image::DynamicImage`] values via
/// [`VideoFrame::to_image`]. Samples deeper than 8 bits are stored as
/// little-endian `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit grayscale.
    Gray8,
    /// 16-bit grayscale.
    Gray16,
    /// Planar 4:2:0, 8 bits.
    Yuv420p8,
    /// Planar 4:2:2, 8 bits.
    Yuv422p8,
    /// Planar 4:4:4, 8 bits.
    Yuv444p8,
    /// Planar 4:1:0, 8 bits.
    Yuv410p8,
    /// Planar 4:1:1, 8 bits.
    Yuv411p8,
    /// Planar 4:2:0, 10 bits.
    Yuv420p10,
    /// Planar 4:2:2, 10 bits.
    Yuv422p10,
    /// Planar 4:4:4, 10 bits.
    Yuv444p10,
    /// Planar 4:2:0, 16 bits.
    Yuv420p16,
    /// Planar 4:2:2, 16 bits.
    Yuv422p16,
    /// Planar 4:4:4, 16 bits.
    Yuv444p16,
    /// Packed 8-bit RGB (24 bpp).
    Rgb8,
    /// Packed 8-bit RGBA with alpha pre-set to 255 (32 bpp).
    Rgba8,
}

/// Geometry of one plane for a given frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Width in pixels (samples for planar formats).
    pub width: u32,
    /// Height in rows.
    pub height: u32,
    /// Bytes per pixel in this plane.
    pub bytes_per_pixel: usize,
}

impl PlaneLayout {
    /// Bytes in one tightly packed row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel
    }

    /// Bytes in the whole plane.
    pub fn len(&self) -> usize {
        self.row_bytes() * self.height as usize
    }

    /// Returns `true` if the plane holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PixelFormat {
    /// Map to the corresponding FFmpeg pixel format constant.
    pub fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            PixelFormat::Gray8 => Pixel::GRAY8,
            PixelFormat::Gray16 => Pixel::GRAY16LE,
            PixelFormat::Yuv420p8 => Pixel::YUV420P,
            PixelFormat::Yuv422p8 => Pixel::YUV422P,
            PixelFormat::Yuv444p8 => Pixel::YUV444P,
            PixelFormat::Yuv410p8 => Pixel::YUV410P,
            PixelFormat::Yuv411p8 => Pixel::YUV411P,
            PixelFormat::Yuv420p10 => Pixel::YUV420P10LE,
            PixelFormat::Yuv422p10 => Pixel::YUV422P10LE,
            PixelFormat::Yuv444p10 => Pixel::YUV444P10LE,
            PixelFormat::Yuv420p16 => Pixel::YUV420P16LE,
            PixelFormat::Yuv422p16 => Pixel::YUV422P16LE,
            PixelFormat::Yuv444p16 => Pixel::YUV444P16LE,
            PixelFormat::Rgb8 => Pixel::RGB24,
            PixelFormat::Rgba8 => Pixel::RGBA,
        }
    }

    /// Pick the output format matching a decoded pixel format.
    ///
    /// Semi-planar and packed YUV layouts map to their planar equivalent,
    /// 9–10 bit formats to 10 bits and 12–16 bit formats to 16 bits. Returns
    /// `None` when there is no conversion path.
    pub fn for_source(source: Pixel) -> Option<Self> {
        let format = match source {
            Pixel::YUV420P | Pixel::YUVJ420P | Pixel::NV12 | Pixel::NV21 | Pixel::YUVA420P => {
                PixelFormat::Yuv420p8
            }
            Pixel::YUV422P | Pixel::YUVJ422P | Pixel::YUYV422 | Pixel::UYVY422 | Pixel::NV16 => {
                PixelFormat::Yuv422p8
            }
            Pixel::YUV444P | Pixel::YUVJ444P => PixelFormat::Yuv444p8,
            Pixel::YUV410P => PixelFormat::Yuv410p8,
            Pixel::YUV411P | Pixel::UYYVYY411 => PixelFormat::Yuv411p8,
            Pixel::YUV420P9LE
            | Pixel::YUV420P9BE
            | Pixel::YUV420P10LE
            | Pixel::YUV420P10BE
            | Pixel::P010LE
            | Pixel::P010BE => PixelFormat::Yuv420p10,
            Pixel::YUV422P9LE | Pixel::YUV422P9BE | Pixel::YUV422P10LE | Pixel::YUV422P10BE => {
                PixelFormat::Yuv422p10
            }
            Pixel::YUV444P9LE | Pixel::YUV444P9BE | Pixel::YUV444P10LE | Pixel::YUV444P10BE => {
                PixelFormat::Yuv444p10
            }
            Pixel::YUV420P12LE
            | Pixel::YUV420P12BE
            | Pixel::YUV420P14LE
            | Pixel::YUV420P14BE
            | Pixel::YUV420P16LE
            | Pixel::YUV420P16BE => PixelFormat::Yuv420p16,
            Pixel::YUV422P12LE
            | Pixel::YUV422P12BE
            | Pixel::YUV422P14LE
            | Pixel::YUV422P14BE
            | Pixel::YUV422P16LE
            | Pixel::YUV422P16BE => PixelFormat::Yuv422p16,
            Pixel::YUV444P12LE
            | Pixel::YUV444P12BE
            | Pixel::YUV444P14LE
            | Pixel::YUV444P14BE
            | Pixel::YUV444P16LE
            | Pixel::YUV444P16BE => PixelFormat::Yuv444p16,
            Pixel::GRAY8 => PixelFormat::Gray8,
            Pixel::GRAY10LE
            | Pixel::GRAY10BE
            | Pixel::GRAY12LE
            | Pixel::GRAY12BE
            | Pixel::GRAY16LE
            | Pixel::GRAY16BE => PixelFormat::Gray16,
            Pixel::RGB24 | Pixel::BGR24 | Pixel::GBRP => PixelFormat::Rgb8,
            Pixel::RGBA | Pixel::BGRA | Pixel::ARGB | Pixel::ABGR => PixelFormat::Rgba8,
            _ => return None,
        };
        Some(format)
    }

    /// Parse a format name such as `YUV420P8`, `yuv444p10`, `gray8`, `rgb24`
    /// or `rgba`. Case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let format = match name.trim().to_ascii_lowercase().as_str() {
            "gray8" | "gray" => PixelFormat::Gray8,
            "gray16" => PixelFormat::Gray16,
            "yuv420p8" | "yuv420p" => PixelFormat::Yuv420p8,
            "yuv422p8" | "yuv422p" => PixelFormat::Yuv422p8,
            "yuv444p8" | "yuv444p" => PixelFormat::Yuv444p8,
            "yuv410p8" | "yuv410p" => PixelFormat::Yuv410p8,
            "yuv411p8" | "yuv411p" => PixelFormat::Yuv411p8,
            "yuv420p10" => PixelFormat::Yuv420p10,
            "yuv422p10" => PixelFormat::Yuv422p10,
            "yuv444p10" => PixelFormat::Yuv444p10,
            "yuv420p16" => PixelFormat::Yuv420p16,
            "yuv422p16" => PixelFormat::Yuv422p16,
            "yuv444p16" => PixelFormat::Yuv444p16,
            "rgb8" | "rgb24" | "rgb" => PixelFormat::Rgb8,
            "rgba8" | "rgba" | "rgba32" | "rgb32" => PixelFormat::Rgba8,
            _ => return None,
        };
        Some(format)
    }

    /// Canonical upper-case name of this format.
    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Gray8 => "GRAY8",
            PixelFormat::Gray16 => "GRAY16",
            PixelFormat::Yuv420p8 => "YUV420P8",
            PixelFormat::Yuv422p8 => "YUV422P8",
            PixelFormat::Yuv444p8 => "YUV444P8",
            PixelFormat::Yuv410p8 => "YUV410P8",
            PixelFormat::Yuv411p8 => "YUV411P8",
            PixelFormat::Yuv420p10 => "YUV420P10",
            PixelFormat::Yuv422p10 => "YUV422P10",
            PixelFormat::Yuv444p10 => "YUV444P10",
            PixelFormat::Yuv420p16 => "YUV420P16",
            PixelFormat::Yuv422p16 => "YUV422P16",
            PixelFormat::Yuv444p16 => "YUV444P16",
            PixelFormat::Rgb8 => "RGB24",
            PixelFormat::Rgba8 => "RGBA32",
        }
    }

    /// Bits per component sample.
    pub fn bit_depth(self) -> u32 {
        match self {
            PixelFormat::Yuv420p10 | PixelFormat::Yuv422p10 | PixelFormat::Yuv444p10 => 10,
            PixelFormat::Gray16
            | PixelFormat::Yuv420p16
            | PixelFormat::Yuv422p16
            | PixelFormat::Yuv444p16 => 16,
            _ => 8,
        }
    }

    /// Returns `true` for planar YUV formats.
    pub fn is_yuv(self) -> bool {
        !matches!(
            self,
            PixelFormat::Gray8 | PixelFormat::Gray16 | PixelFormat::Rgb8 | PixelFormat::Rgba8
        )
    }

    /// Horizontal and vertical chroma subsampling as log2 factors.
    fn chroma_shift(self) -> (u32, u32) {
        match self {
            PixelFormat::Yuv420p8 | PixelFormat::Yuv420p10 | PixelFormat::Yuv420p16 => (1, 1),
            PixelFormat::Yuv422p8 | PixelFormat::Yuv422p10 | PixelFormat::Yuv422p16 => (1, 0),
            PixelFormat::Yuv410p8 => (2, 2),
            PixelFormat::Yuv411p8 => (2, 0),
            _ => (0, 0),
        }
    }

    /// Plane geometry for a frame of `width` × `height` pixels.
    pub fn plane_layouts(self, width: u32, height: u32) -> Vec<PlaneLayout> {
        let sample_bytes = if self.bit_depth() > 8 { 2 } else { 1 };
        match self {
            PixelFormat::Gray8 | PixelFormat::Gray16 => vec![PlaneLayout {
                width,
                height,
                bytes_per_pixel: sample_bytes,
            }],
            PixelFormat::Rgb8 => vec![PlaneLayout {
                width,
                height,
                bytes_per_pixel: 3,
            }],
            PixelFormat::Rgba8 => vec![PlaneLayout {
                width,
                height,
                bytes_per_pixel: 4,
            }],
            _ => {
                let (shift_w, shift_h) = self.chroma_shift();
                let chroma = PlaneLayout {
                    width: subsampled(width, shift_w),
                    height: subsampled(height, shift_h),
                    bytes_per_pixel: sample_bytes,
                };
                vec![
                    PlaneLayout {
                        width,
                        height,
                        bytes_per_pixel: sample_bytes,
                    },
                    chroma,
                    chroma,
                ]
            }
        }
    }

    /// Sample value of "black" for each plane.
    fn black_samples(self) -> Vec<u16> {
        if self.is_yuv() {
            let shift = self.bit_depth() - 8;
            vec![16 << shift, 128 << shift, 128 << shift]
        } else {
            vec![0]
        }
    }
}

fn subsampled(length: u32, shift: u32) -> u32 {
    (length + (1 << shift) - 1) >> shift
}

/// Nominal colour range of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorRange {
    /// Studio swing (MPEG range). Also reported when the range is unknown.
    #[default]
    Limited,
    /// Full swing (JPEG range).
    Full,
}

impl ColorRange {
    /// Map an FFmpeg `AVColorRange` value.
    pub fn from_av_code(code: i32) -> Self {
        if code == ffmpeg_sys_next::AVColorRange::AVCOL_RANGE_JPEG as i32 {
            ColorRange::Full
        } else {
            ColorRange::Limited
        }
    }

    /// Returns `true` for [`ColorRange::Limited`].
    pub fn is_limited(self) -> bool {
        self == ColorRange::Limited
    }
}

/// Matrix coefficients, numbered as in ITU-T H.273.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// Identity matrix (RGB / GBR).
    Rgb,
    /// BT.709.
    Bt709,
    /// Not specified.
    #[default]
    Unspecified,
    /// FCC 73.682.
    Fcc,
    /// BT.470 System B/G (equivalent to BT.601 625).
    Bt470bg,
    /// SMPTE 170M (equivalent to BT.601 525).
    Smpte170m,
    /// SMPTE 240M.
    Smpte240m,
    /// YCgCo.
    YCgCo,
    /// BT.2020 non-constant luminance.
    Bt2020Ncl,
    /// BT.2020 constant luminance.
    Bt2020Cl,
    /// SMPTE ST 2085.
    Smpte2085,
    /// Chromaticity-derived non-constant luminance.
    ChromaDerivedNcl,
    /// Chromaticity-derived constant luminance.
    ChromaDerivedCl,
    /// ICtCp.
    ICtCp,
}

impl ColorSpace {
    /// Map an H.273 matrix code point (which FFmpeg's `AVColorSpace` uses
    /// verbatim). Reserved or unknown values map to `Unspecified`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ColorSpace::Rgb,
            1 => ColorSpace::Bt709,
            4 => ColorSpace::Fcc,
            5 => ColorSpace::Bt470bg,
            6 => ColorSpace::Smpte170m,
            7 => ColorSpace::Smpte240m,
            8 => ColorSpace::YCgCo,
            9 => ColorSpace::Bt2020Ncl,
            10 => ColorSpace::Bt2020Cl,
            11 => ColorSpace::Smpte2085,
            12 => ColorSpace::ChromaDerivedNcl,
            13 => ColorSpace::ChromaDerivedCl,
            14 => ColorSpace::ICtCp,
            _ => ColorSpace::Unspecified,
        }
    }

    /// The H.273 code point.
    pub fn code(self) -> i32 {
        match self {
            ColorSpace::Rgb => 0,
            ColorSpace::Bt709 => 1,
            ColorSpace::Unspecified => 2,
            ColorSpace::Fcc => 4,
            ColorSpace::Bt470bg => 5,
            ColorSpace::Smpte170m => 6,
            ColorSpace::Smpte240m => 7,
            ColorSpace::YCgCo => 8,
            ColorSpace::Bt2020Ncl => 9,
            ColorSpace::Bt2020Cl => 10,
            ColorSpace::Smpte2085 => 11,
            ColorSpace::ChromaDerivedNcl => 12,
            ColorSpace::ChromaDerivedCl => 13,
            ColorSpace::ICtCp => 14,
        }
    }
}

/// Position of chroma samples relative to luma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaLocation {
    /// MPEG-2 / 4:2:0 default.
    Left,
    /// MPEG-1 / JPEG.
    Center,
    /// ITU-R 601 4:2:2.
    TopLeft,
    /// Top.
    Top,
    /// Bottom-left.
    BottomLeft,
    /// Bottom.
    Bottom,
}

impl ChromaLocation {
    /// Map an FFmpeg `AVChromaLocation` value. Unspecified and unknown values
    /// yield `None` so the property can be omitted.
    pub fn from_av_code(code: i32) -> Option<Self> {
        use ffmpeg_sys_next::AVChromaLocation as Av;

        let location = match code {
            c if c == Av::AVCHROMA_LOC_LEFT as i32 => ChromaLocation::Left,
            c if c == Av::AVCHROMA_LOC_CENTER as i32 => ChromaLocation::Center,
            c if c == Av::AVCHROMA_LOC_TOPLEFT as i32 => ChromaLocation::TopLeft,
            c if c == Av::AVCHROMA_LOC_TOP as i32 => ChromaLocation::Top,
            c if c == Av::AVCHROMA_LOC_BOTTOMLEFT as i32 => ChromaLocation::BottomLeft,
            c if c == Av::AVCHROMA_LOC_BOTTOM as i32 => ChromaLocation::Bottom,
            _ => return None,
        };
        Some(location)
    }

    /// The host-side numeric code (0 = left … 5 = bottom).
    pub fn code(self) -> i32 {
        match self {
            ChromaLocation::Left => 0,
            ChromaLocation::Center => 1,
            ChromaLocation::TopLeft => 2,
            ChromaLocation::Top => 3,
            ChromaLocation::BottomLeft => 4,
            ChromaLocation::Bottom => 5,
        }
    }
}

/// Single-character code for an FFmpeg `AVPictureType` value.
pub fn picture_type_char(code: i32) -> char {
    match code {
        1 => 'I',
        2 => 'P',
        3 => 'B',
        4 => 'S',
        5 => 'i',
        6 => 'p',
        7 => 'b',
        _ => '?',
    }
}

/// Metadata stamped onto every materialized frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameProperties {
    /// Sample aspect ratio as `(numerator, denominator)`; `(0, 1)` is unknown.
    pub sample_aspect_ratio: (i32, i32),
    /// Nominal frame duration as `(numerator, denominator)` seconds. Always
    /// the reciprocal of the stream's fixed frame rate.
    pub duration: (i32, i32),
    pub color_range: ColorRange,
    pub color_space: ColorSpace,
    /// Chroma siting, omitted when the stream does not specify one.
    pub chroma_location: Option<ChromaLocation>,
    /// `I`, `P`, `B`, `S`, `i`, `p`, `b` or `?`.
    pub picture_type: char,
    /// `true` for interlaced (field-based) pictures.
    pub interlaced: bool,
}

impl Default for FrameProperties {
    fn default() -> Self {
        Self {
            sample_aspect_ratio: (0, 1),
            duration: (0, 1),
            color_range: ColorRange::Limited,
            color_space: ColorSpace::Unspecified,
            chroma_location: None,
            picture_type: '?',
            interlaced: false,
        }
    }
}

/// A materialized output frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    format: PixelFormat,
    width: u32,
    height: u32,
    planes: Vec<Vec<u8>>,
    properties: FrameProperties,
}

impl VideoFrame {
    /// Build a frame from tightly packed planes.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Setup`] if the plane count or any plane size
    /// does not match the format's layout for `width` × `height`.
    pub fn from_planes(
        format: PixelFormat,
        width: u32,
        height: u32,
        planes: Vec<Vec<u8>>,
    ) -> Result<Self, SourceError> {
        let layouts = format.plane_layouts(width, height);
        if layouts.len() != planes.len() {
            return Err(SourceError::Setup(format!(
                "{} expects {} planes, got {}",
                format.name(),
                layouts.len(),
                planes.len()
            )));
        }
        for (index, (layout, plane)) in layouts.iter().zip(&planes).enumerate() {
            if layout.len() != plane.len() {
                return Err(SourceError::Setup(format!(
                    "plane {index} of a {width}x{height} {} frame needs {} bytes, got {}",
                    format.name(),
                    layout.len(),
                    plane.len()
                )));
            }
        }
        Ok(Self {
            format,
            width,
            height,
            planes,
            properties: FrameProperties::default(),
        })
    }

    /// A solid black frame.
    pub fn black(format: PixelFormat, width: u32, height: u32) -> Self {
        let mut planes: Vec<Vec<u8>> = format
            .plane_layouts(width, height)
            .iter()
            .zip(format.black_samples().into_iter().cycle())
            .map(|(layout, sample)| fill_plane(layout, sample))
            .collect();
        if format == PixelFormat::Rgba8 {
            if let Some(plane) = planes.first_mut() {
                for pixel in plane.chunks_exact_mut(4) {
                    pixel[3] = u8::MAX;
                }
            }
        }
        Self {
            format,
            width,
            height,
            planes,
            properties: FrameProperties::default(),
        }
    }

    /// A black frame with this frame's format, geometry and duration.
    pub fn black_like(&self) -> Self {
        let mut blank = Self::black(self.format, self.width, self.height);
        blank.properties.duration = self.properties.duration;
        blank
    }

    /// Copy `picture` onto this frame with its top-left corner at the origin.
    ///
    /// Parts of `picture` beyond this frame's geometry are clipped.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnsupportedFormat`] if the formats differ.
    pub fn composite(&mut self, picture: &VideoFrame) -> Result<(), SourceError> {
        if picture.format != self.format {
            return Err(SourceError::UnsupportedFormat(format!(
                "cannot composite {} onto {}",
                picture.format.name(),
                self.format.name()
            )));
        }
        let destination_layouts = self.format.plane_layouts(self.width, self.height);
        let source_layouts = picture.format.plane_layouts(picture.width, picture.height);
        for (index, (destination, source)) in
            destination_layouts.iter().zip(&source_layouts).enumerate()
        {
            let rows = destination.height.min(source.height) as usize;
            let copy_bytes = destination.row_bytes().min(source.row_bytes());
            for row in 0..rows {
                let from = row * source.row_bytes();
                let to = row * destination.row_bytes();
                self.planes[index][to..to + copy_bytes]
                    .copy_from_slice(&picture.planes[index][from..from + copy_bytes]);
            }
        }
        Ok(())
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// All planes, tightly packed.
    pub fn planes(&self) -> &[Vec<u8>] {
        &self.planes
    }

    /// A single plane, if it exists.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(Vec::as_slice)
    }

    pub fn properties(&self) -> &FrameProperties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut FrameProperties {
        &mut self.properties
    }

    /// Convert to an [`image::DynamicImage`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnsupportedFormat`] for planar YUV frames;
    /// open the source with an RGB or gray output format to save images.
    pub fn to_image(&self) -> Result<DynamicImage, SourceError> {
        let (width, height) = (self.width, self.height);
        let plane = self.planes[0].clone();
        let invalid = || {
            SourceError::Setup(format!(
                "Failed to construct {} image from frame data",
                self.format.name()
            ))
        };
        match self.format {
            PixelFormat::Rgb8 => RgbImage::from_raw(width, height, plane)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(invalid),
            PixelFormat::Rgba8 => RgbaImage::from_raw(width, height, plane)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(invalid),
            PixelFormat::Gray8 => GrayImage::from_raw(width, height, plane)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(invalid),
            PixelFormat::Gray16 => {
                let samples = plane
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, samples)
                    .map(DynamicImage::ImageLuma16)
                    .ok_or_else(invalid)
            }
            other => Err(SourceError::UnsupportedFormat(format!(
                "{} frames cannot be converted to images",
                other.name()
            ))),
        }
    }
}

fn fill_plane(layout: &PlaneLayout, sample: u16) -> Vec<u8> {
    if layout.bytes_per_pixel == 2 {
        sample
            .to_le_bytes()
            .iter()
            .copied()
            .cycle()
            .take(layout.len())
            .collect()
    } else {
        vec![sample as u8; layout.len()]
    }
}
