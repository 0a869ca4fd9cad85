/// Jumps shorter than the velocity-derived threshold are left alone; longer
/// ones are smoothed, and anything at or past this distance snaps.
const SNAP_DISTANCE: f32 = 100.0;
const THRESHOLD_FACTOR: f32 = 0.3;
const MIN_THRESHOLD: f32 = 10.0;
const MAX_THRESHOLD: f32 = 50.0;
const MIN_SPEED: f32 = 10.0;
const MAX_SPEED: f32 = 40.0;
const MIN_DURATION: f32 = 0.1;
const MAX_DURATION: f32 = 2.0;

struct Transition {
    start: f32,
    target: f32,
    elapsed: f32,
    duration: f32,
}

/// Smooths a remotely synced scalar position on a non-owning peer.
///
/// Feed every synced value to [`PositionInterpolator::set_target`] along
/// with the entity's current velocity, then call
/// [`PositionInterpolator::update`] once per frame.
pub struct PositionInterpolator {
    position: f32,
    last_target: Option<f32>,
    transition: Option<Transition>,
}

impl PositionInterpolator {
    pub fn new(position: f32) -> Self {
        Self {
            position,
            last_target: None,
            transition: None,
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// The most recent synced value still being moved toward, if any.
    pub fn last_target(&self) -> Option<f32> {
        self.last_target
    }

    pub fn is_interpolating(&self) -> bool {
        self.transition.is_some()
    }

    /// Overrides the position, as when the simulation moves the entity itself.
    pub fn set_position(&mut self, position: f32) {
        self.stop();
        self.position = position;
    }

    /// Reacts to a newly synced `target`. Small corrections are ignored,
    /// moderate ones start a smooth transition, large ones snap.
    pub fn set_target(&mut self, target: f32, velocity: f32) {
        let distance = (self.position - target).abs();
        let threshold = (velocity.abs() * THRESHOLD_FACTOR).clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        if distance <= threshold {
            return;
        }

        self.stop();

        if distance < SNAP_DISTANCE {
            let speed = velocity.abs().clamp(MIN_SPEED, MAX_SPEED);
            self.transition = Some(Transition {
                start: self.position,
                target,
                elapsed: 0.0,
                duration: (distance / speed).clamp(MIN_DURATION, MAX_DURATION),
            });
            self.last_target = Some(target);
        } else {
            self.position = target;
        }
    }

    /// Advances the transition by `delta_seconds` and returns the position.
    /// The final step lands exactly on the target.
    pub fn update(&mut self, delta_seconds: f32) -> f32 {
        let Some(transition) = self.transition.as_mut() else {
            return self.position;
        };

        transition.elapsed += delta_seconds;
        if transition.elapsed >= transition.duration {
            self.position = transition.target;
            self.transition = None;
            self.last_target = None;
            return self.position;
        }

        let t = smoothstep(transition.elapsed / transition.duration);
        self.position = transition.start + (transition.target - transition.start) * t;
        self.position
    }

    /// Abandons any transition, leaving the position where it is.
    pub fn stop(&mut self) {
        if self.transition.take().is_some() {
            self.last_target = None;
        }
    }
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
