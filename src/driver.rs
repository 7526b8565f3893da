//! Integration driver
//!
//! Runs the stepper from `t_start` to `t_end`, counts attempts, tracks the
//! range of accepted step sizes and feeds samples to a [`Recorder`]. The
//! final step is truncated so the run ends exactly on `t_end`.

use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::IntegrationConfig;
use crate::error::{ConfigError, SimulationError};
use crate::recorder::Recorder;
use crate::solver::{Bs23, IntegrationError, OdeSystem, StepState};

/// Placement of samples on the time grid `t_start + k·Δ`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplePolicy {
    /// One sample at every grid time, including `t_start`. Grid times
    /// crossed inside a step are filled by cubic Hermite interpolation
    /// between the two accepted states.
    #[default]
    Interpolate,
    /// At most one sample per accepted step, taken at the step's end once it
    /// passes the current threshold; the threshold then advances by one
    /// interval even if the step crossed several.
    Lagging,
    /// Like `Lagging`, but the threshold jumps to the first grid time after
    /// the sample, so skipped grid times are dropped.
    SkipMissed,
}

/// Cubic Hermite interpolation between `(t_a, y_a, f_a)` and `(t_b, y_b, f_b)`
#[allow(clippy::needless_range_loop)]
fn hermite_interp<const N: usize>(
    (t_a, y_a, f_a): (f64, &[f64; N], &[f64; N]),
    (t_b, y_b, f_b): (f64, &[f64; N], &[f64; N]),
    t: f64,
) -> [f64; N] {
    let dt = t_b - t_a;
    let alpha = (t - t_a) / dt;
    let a2 = alpha * alpha;
    let a3 = a2 * alpha;
    let h00 = 1.0 - 3.0 * a2 + 2.0 * a3;
    let h10 = alpha - 2.0 * a2 + a3;
    let h01 = 3.0 * a2 - 2.0 * a3;
    let h11 = -a2 + a3;

    let mut y = [0.0; N];
    for i in 0..N {
        y[i] = h00 * y_a[i] + h10 * dt * f_a[i] + h01 * y_b[i] + h11 * dt * f_b[i];
    }
    y
}

/// Decides when samples are due and emits them
struct Sampler {
    policy: SamplePolicy,
    t_start: f64,
    t_end: f64,
    interval: f64,
    /// Index of the next grid time
    next: u64,
    /// Index of the last grid time not after `t_end`
    last: u64,
    emitted: u64,
    lag_reported: bool,
}

impl Sampler {
    fn new(config: &IntegrationConfig) -> Self {
        let span = (config.t_end - config.t_start) / config.sample_interval;
        Self {
            policy: config.sampling,
            t_start: config.t_start,
            t_end: config.t_end,
            interval: config.sample_interval,
            next: 0,
            last: (span + 1e-9).floor() as u64,
            emitted: 0,
            lag_reported: false,
        }
    }

    fn grid(&self, k: u64) -> f64 {
        self.t_start + k as f64 * self.interval
    }

    fn emit<const N: usize, R: Recorder<N>>(
        &mut self,
        recorder: &mut R,
        t: f64,
        x: &[f64; N],
    ) -> Result<(), SimulationError> {
        recorder.record(t, x)?;
        self.emitted += 1;
        Ok(())
    }

    fn start<const N: usize, R: Recorder<N>>(
        &mut self,
        recorder: &mut R,
        state: &StepState<N>,
    ) -> Result<(), SimulationError> {
        if self.policy == SamplePolicy::Interpolate {
            self.emit(recorder, state.t, &state.x)?;
            self.next = 1;
        }
        Ok(())
    }

    /// Called after every accepted step from `prev` to `cur`
    fn after_step<const N: usize, R: Recorder<N>>(
        &mut self,
        recorder: &mut R,
        prev: &StepState<N>,
        cur: &StepState<N>,
    ) -> Result<(), SimulationError> {
        match self.policy {
            SamplePolicy::Interpolate => {
                while self.next <= self.last {
                    let t = self.grid(self.next).min(self.t_end);
                    if t > cur.t {
                        break;
                    }
                    let x = if t == cur.t {
                        cur.x
                    } else {
                        hermite_interp(
                            (prev.t, &prev.x, &prev.dxdt),
                            (cur.t, &cur.x, &cur.dxdt),
                            t,
                        )
                    };
                    self.emit(recorder, t, &x)?;
                    self.next += 1;
                }
            }
            SamplePolicy::Lagging => {
                if cur.t > self.grid(self.next) {
                    self.emit(recorder, cur.t, &cur.x)?;
                    self.next += 1;
                    if !self.lag_reported && cur.t > self.grid(self.next) {
                        debug!(
                            "step to t = {} crossed several sample times, samples now lag",
                            cur.t
                        );
                        self.lag_reported = true;
                    }
                }
            }
            SamplePolicy::SkipMissed => {
                if cur.t > self.grid(self.next) {
                    self.emit(recorder, cur.t, &cur.x)?;
                    while self.grid(self.next) <= cur.t {
                        self.next += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Aggregate statistics of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary<const N: usize> {
    /// Step attempts, accepted or rejected
    pub steps_total: u64,
    /// Accepted steps
    pub steps_accepted: u64,
    /// Smallest accepted step, excluding the truncated final step
    /// (`INFINITY` if there was none)
    pub min_step: f64,
    /// Largest accepted step, excluding the truncated final step
    pub max_step: f64,
    /// Time reached, equal to `t_end`
    pub final_time: f64,
    /// State at `final_time`
    pub final_state: [f64; N],
    /// Start of the horizon
    pub t_start: f64,
    /// Configured horizon
    pub t_end: f64,
    /// Right-hand-side evaluations, including the initial one
    pub fn_evals: u64,
    /// Samples handed to the recorder
    pub samples: u64,
}

impl<const N: usize> RunSummary<N> {
    /// Rejected attempts divided by all attempts
    pub fn rejected_fraction(&self) -> f64 {
        if self.steps_total == 0 {
            return 0.0;
        }
        (self.steps_total - self.steps_accepted) as f64 / self.steps_total as f64
    }

    /// Horizon length divided by the number of attempts
    pub fn average_step(&self) -> f64 {
        if self.steps_total == 0 {
            return 0.0;
        }
        (self.t_end - self.t_start) / self.steps_total as f64
    }
}

impl<const N: usize> fmt::Display for RunSummary<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Integration finished at t = {}", self.final_time)?;
        writeln!(
            f,
            "  steps:           {} ({} accepted, {:.3}% rejected)",
            self.steps_total,
            self.steps_accepted,
            100.0 * self.rejected_fraction()
        )?;
        writeln!(f, "  average step:    {:.6e}", self.average_step())?;
        if self.min_step.is_finite() {
            writeln!(f, "  step range:      {:.6e} .. {:.6e}", self.min_step, self.max_step)?;
        } else {
            // Only the truncated final step was accepted
            writeln!(f, "  step range:      n/a")?;
        }
        writeln!(f, "  RHS evaluations: {}", self.fn_evals)?;
        write!(f, "  samples:         {}", self.samples)
    }
}

/// Integration loop over a validated [`IntegrationConfig`]
#[derive(Debug, Clone)]
pub struct Driver {
    config: IntegrationConfig,
}

impl Driver {
    /// Validate `config` and build a driver from it
    pub fn new(config: IntegrationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// Integrate `sys` from `x0`, writing the header `names` and then every
    /// sample to `recorder`
    ///
    /// Step rejections are part of normal operation and only show up in the
    /// summary. The recorder's `finish` is called only on success.
    pub fn run<const N: usize, S, R>(
        &self,
        sys: &S,
        x0: &[f64; N],
        names: &[&str],
        recorder: &mut R,
    ) -> Result<RunSummary<N>, SimulationError>
    where
        S: OdeSystem<N>,
        R: Recorder<N>,
    {
        self.validate_inputs(x0, names)?;
        let cfg = &self.config;

        let mut stepper = Bs23::with_controller(cfg.tolerances(), cfg.controller());
        stepper.set_step_limits(cfg.min_step, cfg.max_step);

        info!(
            "integrating {} species over [{}, {}] (tolerance {:e}, initial step {})",
            N, cfg.t_start, cfg.t_end, cfg.tolerance, cfg.initial_step
        );
        debug!(
            "sampling {:?} every {}; safety {}, grow {}, shrink {}",
            cfg.sampling, cfg.sample_interval, cfg.safety, cfg.grow_max, cfg.shrink_max
        );
        debug!(
            "step range [{:e}, {:e}], step limit {:?}",
            cfg.min_step, cfg.max_step, cfg.max_steps
        );

        recorder.begin(names)?;

        let mut state = StepState::new(sys, cfg.t_start, x0, cfg.initial_step);
        let mut sampler = Sampler::new(cfg);
        sampler.start(recorder, &state)?;

        let mut steps_total = 0u64;
        let mut steps_accepted = 0u64;
        let mut min_step = f64::INFINITY;
        let mut max_step = 0.0f64;

        while state.t < cfg.t_end {
            if let Some(limit) = cfg.max_steps {
                if steps_total >= limit {
                    return Err(IntegrationError::MaxStepsExceeded { steps: steps_total }.into());
                }
            }

            // Land exactly on t_end
            let remaining = cfg.t_end - state.t;
            let truncated = state.h > remaining;
            if truncated {
                state.h = remaining;
            }

            let prev = state.clone();
            let result = stepper.step(sys, &mut state)?;
            steps_total += 1;
            if !result.accepted {
                continue;
            }

            steps_accepted += 1;
            if truncated {
                state.t = cfg.t_end;
            } else {
                min_step = min_step.min(result.h_used);
                max_step = max_step.max(result.h_used);
            }

            if !state.x.iter().all(|v| v.is_finite()) {
                return Err(IntegrationError::NonFiniteState { t: state.t }.into());
            }

            sampler.after_step(recorder, &prev, &state)?;
        }

        recorder.finish()?;

        let summary = RunSummary {
            steps_total,
            steps_accepted,
            min_step,
            max_step,
            final_time: state.t,
            final_state: state.x,
            t_start: cfg.t_start,
            t_end: cfg.t_end,
            fn_evals: stepper.stats.fn_evals + 1,
            samples: sampler.emitted,
        };
        info!(
            "reached t = {} after {} steps ({} rejected), {} samples",
            summary.final_time,
            summary.steps_total,
            summary.steps_total - summary.steps_accepted,
            summary.samples
        );
        Ok(summary)
    }

    fn validate_inputs<const N: usize>(
        &self,
        x0: &[f64; N],
        names: &[&str],
    ) -> Result<(), IntegrationError> {
        if names.len() != N {
            return Err(IntegrationError::InvalidInput {
                message: format!("{} names given for {} state components", names.len(), N),
            });
        }
        for (name, &val) in names.iter().zip(x0.iter()) {
            if !val.is_finite() {
                return Err(IntegrationError::InvalidInput {
                    message: format!("initial value of {} is not finite", name),
                });
            }
        }
        Ok(())
    }
}
