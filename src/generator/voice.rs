use super::oscillator::Oscillator;
use super::param::GainParam;
use super::{GeneratorState, SignalGenerator};

/// One sounding tone: an oscillator through an automated gain
///
/// The voice follows the audio context clock. Each sample it renders sits at
/// `clock / sample_rate` seconds; it is silent before `start`, follows the
/// gain automation from `start`, and completes at `stop`. Times are rounded
/// to the nearest sample.
#[derive(Debug, Clone)]
pub struct ToneVoice {
    oscillator: Oscillator,
    gain: GainParam,
    start: f64,
    stop: Option<f64>,

    // State
    origin: u64,
    clock: u64,
    completed: bool,
}

impl ToneVoice {
    /// Wire `oscillator` into `gain`; starts at time zero with no stop
    pub fn new(oscillator: Oscillator, gain: GainParam) -> Self {
        Self {
            oscillator,
            gain,
            start: 0.0,
            stop: None,
            origin: 0,
            clock: 0,
            completed: false,
        }
    }

    pub fn start(&mut self, time: f64) {
        self.start = time.max(0.0);
    }

    pub fn stop(&mut self, time: f64) {
        self.stop = Some(time.max(0.0));
    }

    pub fn start_time(&self) -> f64 {
        self.start
    }

    pub fn stop_time(&self) -> Option<f64> {
        self.stop
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    pub fn gain(&self) -> &GainParam {
        &self.gain
    }

    /// Place the next rendered sample at absolute sample `clock`
    pub fn align(&mut self, clock: u64) {
        self.origin = clock;
        self.clock = clock;
        self.completed = self.is_past_stop(clock);
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    fn sample_rate(&self) -> f64 {
        self.oscillator.sample_rate() as f64
    }

    fn to_sample(&self, time: f64) -> u64 {
        (time * self.sample_rate()).round() as u64
    }

    fn is_past_stop(&self, clock: u64) -> bool {
        self.stop.is_some_and(|stop| clock >= self.to_sample(stop))
    }
}

impl SignalGenerator for ToneVoice {
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState {
        let start_sample = self.to_sample(self.start);
        let stop_sample = self.stop.map(|stop| self.to_sample(stop));
        let sample_rate = self.sample_rate();

        for sample in buffer.iter_mut() {
            let clock = self.clock;
            self.clock += 1;

            if self.completed || stop_sample.is_some_and(|stop| clock >= stop) {
                self.completed = true;
                *sample = 0.0;
                continue;
            }
            if clock < start_sample {
                *sample = 0.0;
                continue;
            }

            let gain = self.gain.value_at(clock as f64 / sample_rate);
            *sample = self.oscillator.next_sample() * gain;
        }

        if !self.completed && stop_sample.is_some_and(|stop| self.clock >= stop) {
            self.completed = true;
        }

        if self.completed {
            GeneratorState::Complete
        } else {
            GeneratorState::Running
        }
    }

    fn is_complete(&self) -> bool {
        self.completed
    }

    fn reset(&mut self) {
        self.oscillator.reset();
        self.align(self.origin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Waveform;

    fn square_voice(sample_rate: u32) -> ToneVoice {
        // Square wave so every sample is exactly +/- gain
        let osc = Oscillator::new(Waveform::Square, 1.0, sample_rate);
        ToneVoice::new(osc, GainParam::new(0.5))
    }

    #[test]
    fn test_silent_before_start() {
        let mut voice = square_voice(1000);
        voice.start(0.004);
        voice.stop(0.010);

        let mut buffer = [1.0f32; 8];
        let state = voice.process(&mut buffer);
        assert_eq!(state, GeneratorState::Running);
        assert_eq!(&buffer[..4], &[0.0; 4]);
        assert_eq!(&buffer[4..], &[0.5; 4]);
    }

    #[test]
    fn test_completes_exactly_at_stop() {
        let mut voice = square_voice(1000);
        voice.stop(0.010);

        let mut buffer = [0.0f32; 10];
        assert_eq!(voice.process(&mut buffer), GeneratorState::Complete);
        assert!(voice.is_complete());
        assert!(buffer.iter().all(|&s| s == 0.5));

        voice.reset();
        let mut buffer = [0.0f32; 16];
        assert_eq!(voice.process(&mut buffer), GeneratorState::Complete);
        assert_eq!(&buffer[..10], &[0.5; 10]);
        assert_eq!(&buffer[10..], &[0.0; 6]);
    }

    #[test]
    fn test_without_stop_runs_forever() {
        let mut voice = square_voice(1000);
        let mut buffer = [0.0f32; 64];
        for _ in 0..100 {
            assert_eq!(voice.process(&mut buffer), GeneratorState::Running);
        }
    }

    #[test]
    fn test_follows_gain_in_context_time() {
        let osc = Oscillator::new(Waveform::Square, 1.0, 1000);
        let mut gain = GainParam::new(0.0);
        gain.set_value_at_time(0.0, 1.0)
            .unwrap()
            .linear_ramp_to_value_at_time(1.0, 1.1)
            .unwrap();
        let mut voice = ToneVoice::new(osc, gain);
        voice.start(1.0);
        voice.stop(1.2);

        // Context clock is already one second in
        voice.align(1000);
        let mut buffer = [0.0f32; 200];
        assert_eq!(voice.process(&mut buffer), GeneratorState::Complete);
        assert!(buffer[0].abs() < 1e-6);
        assert!((buffer[50] - 0.5).abs() < 1e-4);
        assert!((buffer[150] - 1.0).abs() < 1e-6);
        assert_eq!(voice.clock(), 1200);
    }

    #[test]
    fn test_aligned_past_stop_is_complete() {
        let mut voice = square_voice(1000);
        voice.stop(0.5);
        voice.align(600);
        assert!(voice.is_complete());
    }
}
