use super::device::AudioDevice;
use super::track::Track;
use crate::{Error, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::time::Duration;
use tracing::{debug, warn};

/// Rodio-backed channel. One sink at a time; `play` replaces it.
pub struct RodioDevice {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    total: Option<Duration>,
    host_volume: f32,
}

impl RodioDevice {
    pub fn new(host_volume: f32) -> Result<Self> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| Error::Device(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            stream_handle,
            sink: None,
            total: None,
            host_volume: host_volume.clamp(0.0, 1.0),
        })
    }
}

impl AudioDevice for RodioDevice {
    fn play(&mut self, track: &Track) -> Result<()> {
        self.stop();

        let file = File::open(&track.file_path)?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| {
            Error::Decode(format!(
                "'{}': {}. This file may be corrupted or use an unsupported format.",
                track.file_path.display(),
                e
            ))
        })?;
        let total = source.total_duration().or(track.duration);

        let sink = Sink::try_new(&self.stream_handle).map_err(|e| Error::Device(e.to_string()))?;
        sink.set_volume(self.host_volume);
        sink.append(source);

        debug!("Sink started for {} (length {:?})", track.id, total);
        self.sink = Some(sink);
        self.total = total;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.total = None;
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if let Some(sink) = &self.sink {
            sink.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    fn volume(&self) -> f32 {
        self.sink
            .as_ref()
            .map(|sink| sink.volume())
            .unwrap_or(self.host_volume)
    }

    fn seek(&mut self, position: f32) {
        let (Some(sink), Some(total)) = (&self.sink, self.total) else {
            return;
        };
        let target = total.mul_f32(position.clamp(0.0, 1.0));
        if let Err(e) = sink.try_seek(target) {
            warn!("Seek to {:?} failed: {}", target, e);
        }
    }

    fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .map(|sink| !sink.is_paused() && !sink.empty())
            .unwrap_or(false)
    }

    fn elapsed_and_total(&self) -> Option<(f32, f32)> {
        let sink = self.sink.as_ref()?;
        let total = self.total?;
        Some((sink.get_pos().as_secs_f32(), total.as_secs_f32()))
    }

    fn host_volume(&self) -> f32 {
        self.host_volume
    }
}
