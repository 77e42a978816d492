use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

use super::SoundEvent;

/// Short sine chime with an exponential fade-out, used as a timer cue.
pub struct Chime {
    sample_rate: u32,
    frequency: f32,
    volume: f32,
    sample: u32,
    total_samples: u32,
}

impl Chime {
    pub fn new(frequency: f32, length: Duration, volume: f32) -> Self {
        let sample_rate = 44100;
        Self {
            sample_rate,
            frequency,
            volume: volume.clamp(0.0, 1.0),
            sample: 0,
            total_samples: (length.as_secs_f32() * sample_rate as f32) as u32,
        }
    }

    pub fn for_event(event: SoundEvent, volume: f32) -> Self {
        match event {
            SoundEvent::Start => Self::new(880.0, Duration::from_millis(180), volume),
            SoundEvent::Pause => Self::new(660.0, Duration::from_millis(140), volume),
            SoundEvent::Stop => Self::new(440.0, Duration::from_millis(400), volume),
        }
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.sample >= self.total_samples {
            return None;
        }

        let t = self.sample as f32 / self.sample_rate as f32;
        let remaining = 1.0 - self.sample as f32 / self.total_samples as f32;
        self.sample += 1;

        // Squared fade keeps the tail from clicking
        let envelope = remaining * remaining;
        Some((2.0 * PI * self.frequency * t).sin() * envelope * self.volume * 0.5)
    }
}

impl Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        Some((self.total_samples - self.sample.min(self.total_samples)) as usize)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / self.sample_rate as f32,
        ))
    }
}
