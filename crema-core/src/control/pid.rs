//! PID controller with feed-forward and integral clamping
//!
//! Textbook positional PID evaluated at a minimum sample period:
//!
//! - P acts on the error
//! - I integrates the error with the trapezoid rule and is clamped to
//!   the windup limits after every update
//! - D acts on the measurement (not the error) so setpoint steps do not
//!   kick the output
//!
//! A feed-forward term is added before the output is clamped. The boiler
//! uses it to inject a baseline power that depends on its state.

use crate::time::time_diff;

/// PID gains
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidGains {
    /// Proportional gain (output % per °C)
    pub kp: f32,
    /// Integral gain (output % per °C·s)
    pub ki: f32,
    /// Derivative gain (output % per °C/s)
    pub kd: f32,
}

impl PidGains {
    /// Create a gain set
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

/// PID configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidConfig {
    pub gains: PidGains,
    /// Lower output clamp
    pub output_min: f32,
    /// Upper output clamp
    pub output_max: f32,
    /// Lower integral clamp
    pub windup_min: f32,
    /// Upper integral clamp
    pub windup_max: f32,
    /// Calls closer together than this return the previous output
    pub min_sample_ms: u32,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            gains: PidGains::new(0.0, 0.0, 0.0),
            output_min: 0.0,
            output_max: 100.0,
            windup_min: -100.0,
            windup_max: 5.0,
            min_sample_ms: 100,
        }
    }
}

/// PID controller state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pid {
    config: PidConfig,
    feed_forward: f32,
    p_term: f32,
    i_term: f32,
    d_term: f32,
    last_error: f32,
    last_input: f32,
    last_ms: u32,
    output: f32,
}

impl Pid {
    /// Create a controller; call [`Pid::start`] before the first compute
    pub fn new(config: PidConfig) -> Self {
        let mut pid = Self {
            config: PidConfig {
                gains: config.gains,
                ..PidConfig::default()
            },
            feed_forward: 0.0,
            p_term: 0.0,
            i_term: 0.0,
            d_term: 0.0,
            last_error: 0.0,
            last_input: 0.0,
            last_ms: 0,
            output: 0.0,
        };
        pid.set_output_limits(config.output_min, config.output_max);
        pid.set_windup_limits(config.windup_min, config.windup_max);
        pid.set_min_sample_ms(config.min_sample_ms);
        pid
    }

    /// Begin regulating from `input`
    pub fn start(&mut self, input: f32, now_ms: u32) {
        self.reset(input, now_ms);
    }

    /// Zero all terms and take `input` as the new derivative baseline
    pub fn reset(&mut self, input: f32, now_ms: u32) {
        self.p_term = 0.0;
        self.i_term = 0.0;
        self.d_term = 0.0;
        self.last_error = 0.0;
        self.last_input = input;
        self.last_ms = now_ms;
    }

    /// Run one update
    ///
    /// Returns the clamped output. If less than the minimum sample period
    /// has passed since the last update, nothing is recomputed and the
    /// previous output is returned. A non-finite input or setpoint is
    /// skipped the same way and leaves every running term untouched.
    pub fn compute(&mut self, input: f32, setpoint: f32, now_ms: u32) -> f32 {
        let elapsed_ms = time_diff(now_ms, self.last_ms);
        if elapsed_ms < self.config.min_sample_ms {
            return self.output;
        }
        if !input.is_finite() || !setpoint.is_finite() {
            return self.output;
        }

        let dt = elapsed_ms as f32 / 1000.0;
        let error = setpoint - input;
        let gains = self.config.gains;

        self.p_term = gains.kp * error;

        self.i_term += gains.ki * dt * (error + self.last_error) / 2.0;
        self.i_term = self
            .i_term
            .clamp(self.config.windup_min, self.config.windup_max);

        self.d_term = -gains.kd * (input - self.last_input) / dt;

        let unclamped = self.feed_forward + self.p_term + self.i_term + self.d_term;
        self.output = unclamped.clamp(self.config.output_min, self.config.output_max);

        self.last_error = error;
        self.last_input = input;
        self.last_ms = now_ms;

        self.output
    }

    /// Replace the gains; accumulated terms are kept
    pub fn set_gains(&mut self, gains: PidGains) {
        self.config.gains = gains;
    }

    /// Current gains
    pub fn gains(&self) -> PidGains {
        self.config.gains
    }

    /// Set the feed-forward term added to every output
    pub fn set_feed_forward(&mut self, feed_forward: f32) {
        self.feed_forward = feed_forward;
    }

    pub fn feed_forward(&self) -> f32 {
        self.feed_forward
    }

    /// Set the output clamp; ignored unless `max > min`
    pub fn set_output_limits(&mut self, min: f32, max: f32) {
        if max > min {
            self.config.output_min = min;
            self.config.output_max = max;
            self.output = self.output.clamp(min, max);
        }
    }

    /// Set the integral clamp; ignored unless `max > min`
    pub fn set_windup_limits(&mut self, min: f32, max: f32) {
        if max > min {
            self.config.windup_min = min;
            self.config.windup_max = max;
            self.i_term = self.i_term.clamp(min, max);
        }
    }

    /// Set the minimum sample period (at least 1 ms)
    pub fn set_min_sample_ms(&mut self, period_ms: u32) {
        self.config.min_sample_ms = period_ms.max(1);
    }

    /// Last clamped output
    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn p_term(&self) -> f32 {
        self.p_term
    }

    pub fn i_term(&self) -> f32 {
        self.i_term
    }

    pub fn d_term(&self) -> f32 {
        self.d_term
    }
}
