use std::path::Path;

use ffmpeg_next::format::sample::Type as SampleLayout;
use ffmpeg_next::format::Sample;
use ffmpeg_next::software::resampling;
use ffmpeg_next::util::frame::audio::Audio as AudioFrame;
use ffmpeg_next::ChannelLayout;

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_segment::AudioSegment;

/// Decodes the best audio stream of a file to mono f32 PCM with ffmpeg-next.
///
/// Only the channel layout is converted; the clip keeps its recorded sample
/// rate and the recognition pipeline does its own resampling.
pub struct FfmpegAudioReader;

impl AudioReader for FfmpegAudioReader {
    fn read_audio(&self, path: &Path) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let mut ictx = ffmpeg_next::format::input(path)?;

        let Some(stream) = ictx.streams().best(ffmpeg_next::media::Type::Audio) else {
            return Ok(None);
        };
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let mut mono = MonoDecoder::new(codec_ctx.decoder().audio()?)?;

        for (stream, packet) in ictx.packets() {
            if stream.index() == stream_index {
                mono.decoder.send_packet(&packet)?;
                mono.drain()?;
            }
        }
        mono.decoder.send_eof()?;
        mono.drain()?;
        mono.flush();

        log::debug!(
            "Decoded {} samples at {} Hz from {}",
            mono.samples.len(),
            mono.sample_rate,
            path.display()
        );
        Ok(Some(AudioSegment::new(mono.samples, mono.sample_rate)))
    }
}

/// Decoder plus a downmixing resampler at the stream's own rate.
struct MonoDecoder {
    decoder: ffmpeg_next::decoder::Audio,
    resampler: resampling::Context,
    sample_rate: u32,
    decoded: AudioFrame,
    converted: AudioFrame,
    samples: Vec<f32>,
}

impl MonoDecoder {
    fn new(decoder: ffmpeg_next::decoder::Audio) -> Result<Self, ffmpeg_next::Error> {
        let sample_rate = decoder.rate();
        let resampler = resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            sample_rate,
            Sample::F32(SampleLayout::Planar),
            ChannelLayout::MONO,
            sample_rate,
        )?;
        Ok(Self {
            decoder,
            resampler,
            sample_rate,
            decoded: AudioFrame::empty(),
            converted: AudioFrame::empty(),
            samples: Vec::new(),
        })
    }

    /// Pull every frame the decoder has ready.
    fn drain(&mut self) -> Result<(), ffmpeg_next::Error> {
        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            self.resampler.run(&self.decoded, &mut self.converted)?;
            self.push_converted();
        }
        Ok(())
    }

    /// Collect samples still buffered in the resampler.
    fn flush(&mut self) {
        if let Ok(Some(delay)) = self.resampler.flush(&mut self.converted) {
            if delay.output > 0 {
                self.push_converted();
            }
        }
    }

    fn push_converted(&mut self) {
        if self.converted.samples() > 0 {
            self.samples.extend_from_slice(self.converted.plane::<f32>(0));
        }
    }
}
