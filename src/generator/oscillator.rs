use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use super::{GeneratorState, SignalGenerator};

/// Periodic waveform shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Value at `phase` in cycles, `0.0..1.0`, range [-1.0, 1.0]
    fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        };
        f.write_str(name)
    }
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            other => Err(format!("unknown waveform: {}", other)),
        }
    }
}

/// Fixed-frequency oscillator
///
/// Runs forever; the voice that owns it decides when it starts and stops.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f32,
    sample_rate: u32,
    /// Position within the current cycle, in cycles
    phase: f32,
}

impl Oscillator {
    /// # Example
    /// ```
    /// use keypiano::generator::{Oscillator, Waveform};
    ///
    /// let osc = Oscillator::new(Waveform::Sine, 440.0, 44100);
    /// assert_eq!(osc.frequency(), 440.0);
    /// ```
    pub fn new(waveform: Waveform, frequency: f32, sample_rate: u32) -> Self {
        Self {
            waveform,
            frequency,
            sample_rate: sample_rate.max(1),
            phase: 0.0,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Produce one sample and advance the phase
    pub fn next_sample(&mut self) -> f32 {
        let value = self.waveform.sample(self.phase);
        self.phase += self.frequency / self.sample_rate as f32;
        self.phase -= self.phase.floor();
        value
    }
}

impl SignalGenerator for Oscillator {
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
        GeneratorState::Running
    }

    fn is_complete(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_quarter_periods() {
        // 4 samples per cycle
        let mut osc = Oscillator::new(Waveform::Sine, 250.0, 1000);
        let mut buffer = [0.0f32; 8];
        osc.process(&mut buffer);

        let expected = [0.0, 1.0, 0.0, -1.0, 0.0, 1.0, 0.0, -1.0];
        for (got, want) in buffer.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_other_waveforms() {
        let mut square = Oscillator::new(Waveform::Square, 250.0, 1000);
        let mut buffer = [0.0f32; 4];
        square.process(&mut buffer);
        assert_eq!(buffer, [1.0, 1.0, -1.0, -1.0]);

        let mut triangle = Oscillator::new(Waveform::Triangle, 250.0, 1000);
        triangle.process(&mut buffer);
        assert_eq!(buffer, [0.0, 1.0, 0.0, -1.0]);

        let mut saw = Oscillator::new(Waveform::Sawtooth, 250.0, 1000);
        saw.process(&mut buffer);
        assert_eq!(buffer, [-1.0, -0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_reset_restarts_cycle() {
        let mut osc = Oscillator::new(Waveform::Sine, 440.0, 44100);
        let mut first = [0.0f32; 16];
        osc.process(&mut first);
        assert!(!osc.is_complete());

        osc.reset();
        let mut second = [0.0f32; 16];
        osc.process(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_waveform_names() {
        assert_eq!("Sine".parse::<Waveform>(), Ok(Waveform::Sine));
        assert_eq!("saw".parse::<Waveform>(), Ok(Waveform::Sawtooth));
        assert!("noise".parse::<Waveform>().is_err());
        assert_eq!(Waveform::Triangle.to_string(), "triangle");
    }
}
