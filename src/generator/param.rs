//! Time-automated gain
//!
//! A gain value that follows a list of scheduled changes, evaluated at any
//! point in context time (seconds):
//!
//! - `set_value_at_time(v, t)`: jump to `v` at `t`
//! - `linear_ramp_to_value_at_time(v, t)`: straight line from the previous
//!   event to `v` at `t`
//! - `exponential_ramp_to_value_at_time(v, t)`: geometric curve from the
//!   previous event to `v` at `t`
//!
//! Before the first event the parameter holds its default value; after the
//! last it holds the last target.

use thiserror::Error;

/// Rejected automation requests
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutomationError {
    #[error("exponential ramp target must be non-zero, got {0}")]
    ZeroExponentialTarget(f32),
    #[error("automation time must be finite and non-negative, got {0}")]
    InvalidTime(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    Set { value: f32, time: f64 },
    Linear { value: f32, time: f64 },
    Exponential { value: f32, time: f64 },
}

impl Automation {
    fn time(&self) -> f64 {
        match *self {
            Automation::Set { time, .. }
            | Automation::Linear { time, .. }
            | Automation::Exponential { time, .. } => time,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            Automation::Set { value, .. }
            | Automation::Linear { value, .. }
            | Automation::Exponential { value, .. } => value,
        }
    }
}

/// Gain parameter with scheduled ramps
#[derive(Debug, Clone, PartialEq)]
pub struct GainParam {
    default_value: f32,
    events: Vec<Automation>,
}

impl Default for GainParam {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl GainParam {
    /// Create a parameter holding `default_value` until something is scheduled
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<&mut Self, AutomationError> {
        self.insert(Automation::Set { value, time })
    }

    pub fn linear_ramp_to_value_at_time(
        &mut self,
        value: f32,
        time: f64,
    ) -> Result<&mut Self, AutomationError> {
        self.insert(Automation::Linear { value, time })
    }

    /// Schedule a geometric ramp; `value` must not be zero
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f32,
        time: f64,
    ) -> Result<&mut Self, AutomationError> {
        if value == 0.0 {
            return Err(AutomationError::ZeroExponentialTarget(value));
        }
        self.insert(Automation::Exponential { value, time })
    }

    /// Time of the last scheduled event, if any
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(Automation::time)
    }

    fn insert(&mut self, event: Automation) -> Result<&mut Self, AutomationError> {
        let time = event.time();
        if !time.is_finite() || time < 0.0 {
            return Err(AutomationError::InvalidTime(time));
        }
        // Events at equal times keep insertion order
        let index = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(index, event);
        Ok(self)
    }

    /// Value of the parameter at `time` seconds
    pub fn value_at(&self, time: f64) -> f32 {
        // First event strictly after `time`
        let next = self.events.partition_point(|e| e.time() <= time);

        let (start_time, start_value) = match next.checked_sub(1).map(|i| self.events[i]) {
            Some(previous) => (previous.time(), previous.value()),
            None => (0.0, self.default_value),
        };

        match self.events.get(next) {
            None => start_value,
            Some(Automation::Set { .. }) => start_value,
            Some(&Automation::Linear { value, time: end_time }) => {
                let t = progress(start_time, end_time, time);
                start_value + (value - start_value) * t
            }
            Some(&Automation::Exponential { value, time: end_time }) => {
                // No geometric path through zero or across a sign change
                if start_value == 0.0 || (start_value < 0.0) != (value < 0.0) {
                    return start_value;
                }
                let t = progress(start_time, end_time, time);
                start_value * (value / start_value).powf(t)
            }
        }
    }
}

fn progress(start: f64, end: f64, time: f64) -> f32 {
    if end <= start {
        return 1.0;
    }
    ((time - start) / (end - start)).clamp(0.0, 1.0) as f32
}
