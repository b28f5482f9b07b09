//! FFmpeg-backed demux/decode engine.

use std::path::Path;

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::{context::Context as CodecContext, decoder::Video as VideoDecoder, threading},
    error::EAGAIN,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
};
use ffmpeg_sys_next::{
    AVSEEK_FLAG_ANY, AVSEEK_FLAG_BACKWARD, AVSEEK_FLAG_BYTE, AVSEEK_FLAG_FRAME, FF_THREAD_FRAME,
    av_add_index_entry, av_seek_frame,
};

use crate::{
    engine::{DecodeEngine, DecodeStatus, SeekLanding, SeekRequest, SeekTarget},
    error::SourceError,
    index::NativeIndexRecord,
};

/// Demuxer and decoder for one video track of a media file.
///
/// Owns the input context, the opened decoder, the reused packet buffer and
/// the last decoded picture. Created once per [`VideoSource`](crate::VideoSource)
/// and dropped with it.
pub struct FfmpegEngine {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    packet: Packet,
    packet_pending: bool,
    draining: bool,
    picture: VideoFrame,
    tolerate_decode_errors: bool,
    reported_delay: u32,
}

impl FfmpegEngine {
    /// Open `path` and prepare a decoder for stream `stream_index`.
    ///
    /// `threads` is the decoder thread count (0 lets FFmpeg decide). With
    /// `tolerate_decode_errors`, packets the decoder rejects are skipped
    /// instead of failing the stream.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::FileOpen`] if the file cannot be opened,
    /// [`SourceError::VideoTrackOutOfRange`] if the stream is missing or not
    /// video, and [`SourceError::Setup`] if no decoder can be opened.
    pub fn open<P: AsRef<Path>>(
        path: P,
        stream_index: usize,
        threads: usize,
        tolerate_decode_errors: bool,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let input = ffmpeg_next::format::input(&path).map_err(|error| SourceError::FileOpen {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let decoder = {
            let stream = input
                .stream(stream_index)
                .filter(|stream| stream.parameters().medium() == Type::Video)
                .ok_or(SourceError::VideoTrackOutOfRange {
                    stream_index,
                    stream_count: input.nb_streams() as usize,
                })?;
            let mut context = CodecContext::from_parameters(stream.parameters()).map_err(|error| {
                SourceError::Setup(format!(
                    "Failed to read codec parameters for stream {stream_index}: {error}"
                ))
            })?;
            context.set_threading(threading::Config {
                kind: threading::Type::Frame,
                count: threads,
                ..Default::default()
            });
            context.decoder().video().map_err(|error| {
                SourceError::Setup(format!(
                    "Failed to open video decoder for stream {stream_index}: {error}"
                ))
            })?
        };

        let reported_delay = {
            // SAFETY: the decoder context is open and owned by `decoder`.
            let context = unsafe { &*decoder.as_ptr() };
            let frame_threads = if context.active_thread_type & FF_THREAD_FRAME as i32 != 0 {
                context.thread_count.max(1) - 1
            } else {
                0
            };
            u32::try_from(context.has_b_frames.max(0) + frame_threads).unwrap_or(0)
        };

        log::debug!(
            "Opened {:?} decoder for stream {stream_index} (reported delay {reported_delay})",
            decoder.id()
        );

        Ok(Self {
            input,
            decoder,
            stream_index,
            packet: Packet::empty(),
            packet_pending: false,
            draining: false,
            picture: VideoFrame::empty(),
            tolerate_decode_errors,
            reported_delay,
        })
    }

    /// Native pixel format of the decoder output.
    pub fn pixel_format(&self) -> Pixel {
        self.decoder.format()
    }

    /// Coded picture size as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.decoder.width(), self.decoder.height())
    }

    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Read the next packet of the track. Returns `false` at end of file.
    fn read_packet(&mut self) -> Result<bool, SourceError> {
        loop {
            match self.packet.read(&mut self.input) {
                Ok(()) if self.packet.stream() == self.stream_index => return Ok(true),
                Ok(()) => continue,
                Err(FfmpegError::Eof) => return Ok(false),
                Err(error) => {
                    return Err(SourceError::Decode(format!("Failed to read packet: {error}")));
                }
            }
        }
    }

    fn receive(&mut self) -> Result<DecodeStatus, SourceError> {
        match self.decoder.receive_frame(&mut self.picture) {
            Ok(()) => Ok(DecodeStatus::Picture),
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => {
                if self.draining {
                    Ok(DecodeStatus::EndOfStream)
                } else {
                    Ok(DecodeStatus::NeedMoreInput)
                }
            }
            Err(FfmpegError::Eof) => Ok(DecodeStatus::EndOfStream),
            Err(error) if self.tolerate_decode_errors && !self.draining => {
                log::debug!("Skipping undecodable picture: {error}");
                Ok(DecodeStatus::NeedMoreInput)
            }
            Err(error) => Err(SourceError::Decode(format!(
                "Failed to receive picture: {error}"
            ))),
        }
    }

    /// Read ahead to the packet whose `key` is `expected` and keep it
    /// pending for the next attempt.
    fn land_on(
        &mut self,
        expected: i64,
        key: fn(&Packet) -> Option<i64>,
    ) -> Result<SeekLanding, SourceError> {
        let mut skipped = 0u32;
        while self.read_packet()? {
            match key(&self.packet) {
                Some(value) if value < expected => skipped += 1,
                Some(value) if value > expected => return Ok(SeekLanding::Overshot),
                _ => {
                    if skipped > 0 {
                        log::trace!("Skipped {skipped} packets ahead of the random access point");
                    }
                    self.packet_pending = true;
                    return Ok(SeekLanding::Exact);
                }
            }
        }
        Ok(SeekLanding::Overshot)
    }

    fn seek_to(&mut self, value: i64, flags: u32) -> i32 {
        // SAFETY: the input context is open and `stream_index` names one of
        // its streams.
        unsafe {
            av_seek_frame(
                self.input.as_mut_ptr(),
                self.stream_index as i32,
                value,
                flags as i32,
            )
        }
    }
}

impl DecodeEngine for FfmpegEngine {
    type Picture = VideoFrame;

    fn read_and_decode(&mut self) -> Result<DecodeStatus, SourceError> {
        if self.draining {
            return self.receive();
        }

        if !self.packet_pending && !self.read_packet()? {
            log::trace!("End of input, draining decoder");
            self.decoder
                .send_eof()
                .map_err(|error| SourceError::Decode(format!("Failed to drain decoder: {error}")))?;
            self.draining = true;
            return self.receive();
        }

        match self.decoder.send_packet(&self.packet) {
            Ok(()) => self.packet_pending = false,
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => self.packet_pending = true,
            Err(error) if self.tolerate_decode_errors => {
                log::debug!("Skipping packet rejected by the decoder: {error}");
                self.packet_pending = false;
                return Ok(DecodeStatus::NeedMoreInput);
            }
            Err(error) => {
                return Err(SourceError::Decode(format!(
                    "Decoder rejected packet: {error}"
                )));
            }
        }

        self.receive()
    }

    fn picture(&self) -> &VideoFrame {
        &self.picture
    }

    fn seek(&mut self, request: &SeekRequest) -> Result<SeekLanding, SourceError> {
        let (value, flags) = match request.target {
            SeekTarget::Byte(position) => (position, AVSEEK_FLAG_BYTE | AVSEEK_FLAG_BACKWARD),
            SeekTarget::Timestamp(timestamp) => (timestamp, AVSEEK_FLAG_BACKWARD),
            SeekTarget::Frame(frame) => (frame, AVSEEK_FLAG_FRAME | AVSEEK_FLAG_BACKWARD),
        };

        let mut result = self.seek_to(value, flags);
        if result < 0 {
            log::debug!(
                "Seek to frame {} rejected ({}), retrying with closest match",
                request.frame,
                FfmpegError::from(result)
            );
            result = self.seek_to(value, flags | AVSEEK_FLAG_ANY);
        }
        if result < 0 {
            return Err(SourceError::Decode(format!(
                "Failed to seek to frame {}: {}",
                request.frame,
                FfmpegError::from(result)
            )));
        }

        self.decoder.flush();
        self.packet_pending = false;
        self.draining = false;

        let landing = match request.target {
            SeekTarget::Byte(position) => self.land_on(position, |packet| {
                Some(packet.position() as i64).filter(|&position| position >= 0)
            })?,
            SeekTarget::Timestamp(timestamp) => {
                self.land_on(timestamp, |packet| packet.dts().or(packet.pts()))?
            }
            SeekTarget::Frame(_) => SeekLanding::Exact,
        };
        log::trace!(
            "Seeked to frame {} ({:?}): {landing:?}",
            request.frame,
            request.target
        );
        Ok(landing)
    }

    fn reported_delay(&self) -> u32 {
        self.reported_delay
    }

    fn import_index(&mut self, records: &[NativeIndexRecord]) -> Result<(), SourceError> {
        // SAFETY: the input context is open and `stream_index` is in bounds.
        let stream = unsafe { *(*self.input.as_mut_ptr()).streams.add(self.stream_index) };
        for record in records {
            // SAFETY: `stream` is a valid stream of the open input context.
            let result = unsafe {
                av_add_index_entry(
                    stream,
                    record.byte_position,
                    record.timestamp,
                    record.size,
                    record.min_distance,
                    record.flags,
                )
            };
            if result < 0 {
                return Err(SourceError::IndexImport(format!(
                    "entry at byte {} (timestamp {}) was refused: {}",
                    record.byte_position,
                    record.timestamp,
                    FfmpegError::from(result)
                )));
            }
        }
        log::debug!("Imported {} index entries into the demuxer", records.len());
        Ok(())
    }
}
