//! Tone generator driven by the sound timer.

use std::collections::VecDeque;
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    #[default]
    Square,
    Saw,
}

/// Synthesises a mono 16-bit tone into a bounded sample queue that an audio
/// backend drains at its own pace.
#[derive(Debug)]
pub struct ToneGenerator {
    /// Loudness in decibels.
    pub level: f64,
    /// Pitch in hertz.
    pub frequency: u32,
    waveform: Waveform,
    sample_count: u64,
    queue: VecDeque<i16>,
}

impl ToneGenerator {
    /// Samples synthesised per refill.
    pub const BUFFER_SIZE: usize = 256;
    pub const SAMPLE_RATE: u32 = 44100;
    const GAIN: f64 = 1000.0;

    pub fn new(waveform: Waveform, level: f64, frequency: u32) -> Self {
        Self {
            level,
            frequency,
            waveform,
            sample_count: 0,
            queue: VecDeque::with_capacity(Self::BUFFER_SIZE * 2),
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn change_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
        self.sample_count = 0;
    }

    /// Tops the queue up to two buffers' worth of samples.
    pub fn play(&mut self) {
        let amplitude = 10f64.powf(self.level / 20.0);

        while self.queue.len() < Self::BUFFER_SIZE * 2 {
            for _ in 0..Self::BUFFER_SIZE {
                let sample = (amplitude * Self::GAIN * self.next_sample())
                    .clamp(i16::MIN as f64, i16::MAX as f64);
                self.queue.push_back(sample as i16);
                self.sample_count += 1;
            }
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Removes up to `n` samples from the front of the queue.
    pub fn drain(&mut self, n: usize) -> Vec<i16> {
        let n = n.min(self.queue.len());
        self.queue.drain(..n).collect()
    }

    fn next_sample(&self) -> f64 {
        let t = self.sample_count as f64 / Self::SAMPLE_RATE as f64;
        let frequency = self.frequency as f64;

        match self.waveform {
            Waveform::Sine => (2.0 * PI * frequency * t).sin(),
            Waveform::Square => {
                if (2.0 * frequency * t).floor() as i64 % 2 == 0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => {
                let period = t * frequency;
                2.0 * (period - (0.5 + period).floor())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_bounded() {
        let mut beeper = ToneGenerator::new(Waveform::Square, 0.0, 440);
        beeper.play();
        assert_eq!(beeper.queued(), ToneGenerator::BUFFER_SIZE * 2);
        beeper.play();
        assert_eq!(beeper.queued(), ToneGenerator::BUFFER_SIZE * 2);

        beeper.drain(10);
        beeper.play();
        assert_eq!(beeper.queued(), ToneGenerator::BUFFER_SIZE * 3 - 10);
    }

    #[test]
    fn square_wave_amplitude_follows_level() {
        let mut beeper = ToneGenerator::new(Waveform::Square, 0.0, 440);
        beeper.play();
        let samples = beeper.drain(1);
        assert_eq!(samples, vec![1000]);

        let mut louder = ToneGenerator::new(Waveform::Square, 20.0, 440);
        louder.play();
        assert_eq!(louder.drain(1), vec![10000]);
    }

    #[test]
    fn samples_are_clipped() {
        let mut beeper = ToneGenerator::new(Waveform::Square, 60.0, 440);
        beeper.play();
        assert_eq!(beeper.drain(1), vec![i16::MAX]);
    }

    #[test]
    fn change_waveform_restarts_phase() {
        let mut beeper = ToneGenerator::new(Waveform::Saw, 0.0, 440);
        beeper.play();
        beeper.change_waveform(Waveform::Sine);
        assert_eq!(beeper.waveform(), Waveform::Sine);
        beeper.drain(usize::MAX);
        beeper.play();
        assert_eq!(beeper.drain(1), vec![0]);
    }
}
