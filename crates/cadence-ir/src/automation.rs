//! Automation timelines for node parameters.
//!
//! An `AudioParam` is a scalar with an intrinsic value plus a time-ordered
//! list of automation events. Evaluation follows the host engine's rules:
//! a set-target approach runs until the next event's time, and a ramp
//! starts from whatever value the previous event left behind.

use crate::numeric::finite;

/// Smallest time constant accepted by a set-target event.
pub const MIN_TIME_CONSTANT: f64 = 1e-6;

/// A single automation event on a parameter timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Automation {
    /// Jump to `value` at `time`.
    SetValue { value: f64, time: f64 },
    /// Approach `target` exponentially from `time` with the given time constant.
    SetTarget {
        target: f64,
        time: f64,
        time_constant: f64,
    },
    /// Reach `value` at `time` along a straight line.
    LinearRamp { value: f64, time: f64 },
    /// Reach `value` at `time` along an exponential curve.
    ExponentialRamp { value: f64, time: f64 },
}

impl Automation {
    /// The time at which this event takes effect (or completes, for ramps).
    pub fn time(&self) -> f64 {
        match *self {
            Automation::SetValue { time, .. }
            | Automation::SetTarget { time, .. }
            | Automation::LinearRamp { time, .. }
            | Automation::ExponentialRamp { time, .. } => time,
        }
    }

    /// Copy of this event with every field passed through the finite guard.
    fn sanitized(self) -> Self {
        match self {
            Automation::SetValue { value, time } => Automation::SetValue {
                value: finite(value),
                time: finite(time),
            },
            Automation::SetTarget {
                target,
                time,
                time_constant,
            } => Automation::SetTarget {
                target: finite(target),
                time: finite(time),
                time_constant: finite(time_constant).max(MIN_TIME_CONSTANT),
            },
            Automation::LinearRamp { value, time } => Automation::LinearRamp {
                value: finite(value),
                time: finite(time),
            },
            Automation::ExponentialRamp { value, time } => Automation::ExponentialRamp {
                value: finite(value),
                time: finite(time),
            },
        }
    }
}

/// An automatable parameter on a graph node.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioParam {
    name: &'static str,
    default: f64,
    value: f64,
    events: Vec<Automation>,
}

impl AudioParam {
    /// Create a parameter holding its default value with an empty timeline.
    pub fn new(name: &'static str, default: f64) -> Self {
        let default = finite(default);
        Self {
            name,
            default,
            value: default,
            events: Vec::new(),
        }
    }

    /// Parameter name, e.g. `"gain"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The value the parameter was created with.
    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Intrinsic value, ignoring automation.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the intrinsic value used before any event.
    pub fn set_value(&mut self, value: f64) {
        self.value = finite(value);
    }

    /// Scheduled automation in time order.
    pub fn events(&self) -> &[Automation] {
        &self.events
    }

    /// Insert an automation event, keeping the timeline sorted.
    ///
    /// Events sharing a timestamp stay in insertion order.
    pub fn schedule(&mut self, event: Automation) {
        let event = event.sanitized();
        let time = event.time();
        let pos = self
            .events
            .iter()
            .position(|e| e.time() > time)
            .unwrap_or(self.events.len());
        self.events.insert(pos, event);
    }

    /// Jump to `value` at `time`.
    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.schedule(Automation::SetValue { value, time });
    }

    /// Approach `target` exponentially from `time`.
    pub fn set_target_at(&mut self, target: f64, time: f64, time_constant: f64) {
        self.schedule(Automation::SetTarget {
            target,
            time,
            time_constant,
        });
    }

    /// Ramp linearly to `value`, ending at `time`.
    pub fn linear_ramp_to(&mut self, value: f64, time: f64) {
        self.schedule(Automation::LinearRamp { value, time });
    }

    /// Ramp exponentially to `value`, ending at `time`.
    pub fn exponential_ramp_to(&mut self, value: f64, time: f64) {
        self.schedule(Automation::ExponentialRamp { value, time });
    }

    /// Remove every event at or after `time`.
    pub fn cancel_from(&mut self, time: f64) {
        let time = finite(time);
        self.events.retain(|e| e.time() < time);
    }

    /// Evaluate the timeline at `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        let mut value = self.value;
        let mut prev_time = 0.0;

        for (i, event) in self.events.iter().enumerate() {
            match *event {
                Automation::SetValue { value: v, time } => {
                    if time > t {
                        break;
                    }
                    value = v;
                    prev_time = time;
                }
                Automation::LinearRamp { value: v, time } => {
                    if time > t {
                        if t > prev_time {
                            let k = (t - prev_time) / (time - prev_time);
                            return value + (v - value) * k;
                        }
                        break;
                    }
                    value = v;
                    prev_time = time;
                }
                Automation::ExponentialRamp { value: v, time } => {
                    if time > t {
                        // Sign change or zero endpoint: hold until the ramp's end.
                        if t > prev_time && value * v > 0.0 {
                            let k = (t - prev_time) / (time - prev_time);
                            return value * libm::pow(v / value, k);
                        }
                        break;
                    }
                    value = v;
                    prev_time = time;
                }
                Automation::SetTarget {
                    target,
                    time,
                    time_constant,
                } => {
                    if time > t {
                        break;
                    }
                    let end = self
                        .events
                        .get(i + 1)
                        .map(Automation::time)
                        .unwrap_or(f64::INFINITY);
                    if t < end {
                        return approach(value, target, t - time, time_constant);
                    }
                    value = approach(value, target, end - time, time_constant);
                    prev_time = end;
                }
            }
        }

        value
    }
}

/// Value of an exponential approach from `from` toward `target` after `elapsed`.
fn approach(from: f64, target: f64, elapsed: f64, time_constant: f64) -> f64 {
    target + (from - target) * libm::exp(-elapsed / time_constant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_timeline_returns_intrinsic_value() {
        let mut p = AudioParam::new("gain", 1.0);
        assert_eq!(p.value_at(10.0), 1.0);
        p.set_value(0.25);
        assert_eq!(p.value_at(10.0), 0.25);
    }

    #[test]
    fn set_value_takes_effect_at_its_time() {
        let mut p = AudioParam::new("gain", 0.0);
        p.set_value_at(1.0, 2.0);
        assert_eq!(p.value_at(1.999), 0.0);
        assert_eq!(p.value_at(2.0), 1.0);
    }

    #[test]
    fn linear_ramp_interpolates_from_previous_event() {
        let mut p = AudioParam::new("gain", 0.0);
        p.set_value_at(0.0, 1.0);
        p.linear_ramp_to(10.0, 3.0);
        assert!(close(p.value_at(2.0), 5.0));
        assert!(close(p.value_at(3.0), 10.0));
        assert!(close(p.value_at(9.0), 10.0));
    }

    #[test]
    fn exponential_ramp_interpolates_geometrically() {
        let mut p = AudioParam::new("frequency", 0.0);
        p.set_value_at(100.0, 0.0);
        p.exponential_ramp_to(400.0, 2.0);
        assert!(close(p.value_at(1.0), 200.0));
    }

    #[test]
    fn exponential_ramp_through_zero_holds() {
        let mut p = AudioParam::new("gain", 0.0);
        p.exponential_ramp_to(1.0, 2.0);
        assert_eq!(p.value_at(1.0), 0.0);
        assert_eq!(p.value_at(2.0), 1.0);
    }

    #[test]
    fn set_target_approaches_asymptotically() {
        let mut p = AudioParam::new("gain", 0.0);
        p.set_target_at(1.0, 0.0, 0.5);
        let after_one_tau = p.value_at(0.5);
        assert!(close(after_one_tau, 1.0 - (-1.0f64).exp()));
        assert!(p.value_at(100.0) < 1.0 + 1e-12);
        assert!(p.value_at(100.0) > 0.999);
    }

    #[test]
    fn set_target_stops_at_next_event() {
        let mut p = AudioParam::new("gain", 0.0);
        p.set_target_at(1.0, 0.0, 1.0);
        p.set_value_at(0.2, 1.0);
        assert!(p.value_at(0.5) > 0.3);
        assert_eq!(p.value_at(1.5), 0.2);
    }

    #[test]
    fn equal_times_keep_insertion_order() {
        let mut p = AudioParam::new("gain", 0.0);
        p.set_value_at(1.0, 1.0);
        p.set_value_at(2.0, 1.0);
        assert_eq!(p.value_at(1.0), 2.0);
        assert_eq!(p.events().len(), 2);
    }

    #[test]
    fn cancel_from_drops_later_events() {
        let mut p = AudioParam::new("gain", 0.0);
        p.set_value_at(1.0, 1.0);
        p.set_value_at(2.0, 2.0);
        p.cancel_from(2.0);
        assert_eq!(p.events().len(), 1);
        assert_eq!(p.value_at(5.0), 1.0);
    }

    #[test]
    fn non_finite_arguments_are_guarded() {
        let mut p = AudioParam::new("gain", f64::NAN);
        assert_eq!(p.value(), 0.0);
        p.set_target_at(f64::INFINITY, f64::NAN, 0.0);
        assert_eq!(
            p.events()[0],
            Automation::SetTarget {
                target: 0.0,
                time: 0.0,
                time_constant: MIN_TIME_CONSTANT
            }
        );
    }
}
