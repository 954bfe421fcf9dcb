//! Microphone loudness monitoring.
//!
//! A cpal input stream computes one normalized level per captured buffer on
//! the audio thread and publishes it through a single-slot atomic cell; the
//! frame loop reads the latest value without blocking. Only the newest
//! sample matters, so there is no queue and no back-pressure.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample};

use crate::params::AudioConfig;

/// Map a buffer RMS to the normalized [0,1] loudness the visuals consume.
///
/// rms → decibels (silence floored), clamped to the configured window,
/// then scaled so `min_db` → 0 and `max_db` → 1.
pub fn normalized_level(rms: f32, config: &AudioConfig) -> f32 {
    let db = if rms > 0.0 {
        20.0 * rms.log10()
    } else {
        config.silence_floor_db
    };
    let db = db.clamp(config.min_db, config.max_db);
    (db - config.min_db) / (config.max_db - config.min_db)
}

/// RMS over one channel of an interleaved buffer
fn channel_rms<T: Sample<Float = f32> + Copy>(samples: &[T], channels: usize) -> f32 {
    let mut sum = 0.0f64;
    let mut count = 0u32;
    for sample in samples.iter().step_by(channels.max(1)) {
        let value = (*sample).to_float_sample();
        sum += (value * value) as f64;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        ((sum / count as f64) as f32).sqrt()
    }
}

/// Single-slot last-value-wins hand-off between the audio thread and the
/// frame loop. The `active` flag is the one authority on whether the
/// capture callback may publish.
struct LevelCell {
    bits: AtomicU32,
    active: AtomicBool,
}

impl LevelCell {
    fn new() -> Self {
        Self {
            bits: AtomicU32::new(0.0f32.to_bits()),
            active: AtomicBool::new(false),
        }
    }

    fn store(&self, level: f32) {
        self.bits.store(level.to_bits(), Ordering::Release);
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

/// Microphone level monitor with explicit start/stop lifecycle.
///
/// Start is idempotent while running; stop tears the stream down, is safe
/// to call repeatedly, and resets the published level to 0. Any capture
/// failure leaves the monitor inactive with level 0: audio reactivity
/// degrades, the app keeps running.
pub struct AudioMonitor {
    config: AudioConfig,
    cell: Arc<LevelCell>,
    stream: Option<cpal::Stream>,
}

impl AudioMonitor {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            cell: Arc::new(LevelCell::new()),
            stream: None,
        }
    }

    /// Begin capturing from the default input device
    pub fn start(&mut self) -> Result<(), String> {
        if self.is_active() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or("no audio input device available")?;

        let supported = device
            .default_input_config()
            .map_err(|e| format!("failed to get input config: {}", e))?;

        println!(
            "Audio in: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            supported.sample_rate().0
        );

        let channels = supported.channels() as usize;
        let stream_config: cpal::StreamConfig = supported.clone().into();

        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                self.build_stream::<f32>(&device, &stream_config, channels)
            }
            SampleFormat::I16 => {
                self.build_stream::<i16>(&device, &stream_config, channels)
            }
            SampleFormat::U16 => {
                self.build_stream::<u16>(&device, &stream_config, channels)
            }
            other => Err(format!("unsupported sample format: {:?}", other)),
        }?;

        stream
            .play()
            .map_err(|e| format!("failed to start input stream: {}", e))?;

        // Publish only once the stream is definitely live; a concurrent
        // stop() clears this flag and the callback goes quiet.
        self.cell.active.store(true, Ordering::Release);
        self.stream = Some(stream);
        Ok(())
    }

    /// Tear down capture and reset the published level
    pub fn stop(&mut self) {
        self.cell.active.store(false, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        self.cell.store(0.0);
    }

    pub fn is_active(&self) -> bool {
        self.cell.active.load(Ordering::Acquire)
    }

    /// Most recent normalized level, clamped to [0,1]
    pub fn level(&self) -> f32 {
        self.cell.load().clamp(0.0, 1.0)
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        stream_config: &cpal::StreamConfig,
        channels: usize,
    ) -> Result<cpal::Stream, String>
    where
        T: SizedSample + Sample<Float = f32>,
    {
        let cell = Arc::clone(&self.cell);
        let config = self.config;

        device
            .build_input_stream(
                stream_config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if !cell.active.load(Ordering::Acquire) {
                        return;
                    }
                    let rms = channel_rms(data, channels);
                    cell.store(normalized_level(rms, &config));
                },
                |err| log::warn!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| format!("failed to build input stream: {}", e))
    }
}

impl Drop for AudioMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_maps_to_zero() {
        let config = AudioConfig::default();
        assert_eq!(normalized_level(0.0, &config), 0.0);
        // Anything below the -60 dB window also pins to 0
        assert_eq!(normalized_level(0.0001, &config), 0.0);
    }

    #[test]
    fn test_full_scale_maps_to_one() {
        let config = AudioConfig::default();
        // rms = 1.0 is 0 dB, the top of the window
        assert_eq!(normalized_level(1.0, &config), 1.0);
        // Clipping beyond full scale stays pinned at 1
        assert_eq!(normalized_level(4.0, &config), 1.0);
    }

    #[test]
    fn test_level_monotonic_and_bounded() {
        let config = AudioConfig::default();
        let mut previous = 0.0;
        for step in 0..=100 {
            let rms = step as f32 / 100.0;
            let level = normalized_level(rms, &config);
            assert!((0.0..=1.0).contains(&level), "level {} out of bounds", level);
            assert!(level >= previous, "not monotonic at rms {}", rms);
            previous = level;
        }
    }

    #[test]
    fn test_midpoint_of_window() {
        let config = AudioConfig::default();
        // -30 dB is the middle of the [-60, 0] window: rms = 10^(-30/20)
        let rms = 10.0f32.powf(-30.0 / 20.0);
        let level = normalized_level(rms, &config);
        assert!((level - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_channel_rms_uses_first_channel() {
        // Interleaved stereo: left channel constant 0.5, right silent
        let samples = [0.5f32, 0.0, 0.5, 0.0, 0.5, 0.0, 0.5, 0.0];
        let rms = channel_rms(&samples, 2);
        assert!((rms - 0.5).abs() < 1e-6);

        assert_eq!(channel_rms::<f32>(&[], 2), 0.0);
    }

    #[test]
    fn test_stop_without_start_is_safe() {
        let mut monitor = AudioMonitor::new(AudioConfig::default());
        monitor.stop();
        monitor.stop();
        assert!(!monitor.is_active());
        assert_eq!(monitor.level(), 0.0);
    }

    #[test]
    fn test_cell_roundtrip_and_defensive_clamp() {
        let monitor = AudioMonitor::new(AudioConfig::default());
        monitor.cell.store(0.75);
        assert_eq!(monitor.level(), 0.75);

        // A garbage publish never escapes the [0,1] contract
        monitor.cell.store(3.5);
        assert_eq!(monitor.level(), 1.0);
    }
}
