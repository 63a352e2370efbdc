//! Map-wide navigation animation.
//!
//! One combined transform (scale factor plus translation) is interpolated and
//! applied in lock-step to every participant container. Time is passed in by
//! the caller so the controller can be driven by any frame clock.

use crate::animation::easing::EasingType;
use crate::core::geo::Point;
use crate::core::transform::Transform;
use crate::rendering::surface::SurfaceHandle;
use crate::traits::Lerp;
use instant::Instant;
use log::{debug, trace};
use std::time::Duration;

/// A tween between two values over an explicit time window
#[derive(Debug, Clone)]
pub struct Tween<T: Lerp + Clone> {
    pub from: T,
    pub to: T,
    pub duration: Duration,
    pub easing: EasingType,
    start_time: Instant,
}

impl<T: Lerp + Clone> Tween<T> {
    pub fn new(from: T, to: T, duration: Duration, easing: EasingType, now: Instant) -> Self {
        Self {
            from,
            to,
            duration,
            easing,
            start_time: now,
        }
    }

    /// Linear progress in `[0, 1]`
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.duration_since(self.start_time);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn value_at(&self, now: Instant) -> T {
        let progress = self.progress(now);
        if progress >= 1.0 {
            return self.to.clone();
        }
        self.from.lerp(&self.to, self.easing.apply(progress))
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Running,
    Completed,
}

/// Transform applied to the participants by one step of the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    pub transform: Transform,
    pub progress: f64,
    /// Set on the frame that finished the animation
    pub completed: bool,
}

/// A container moved by the animation. `base` is applied before the
/// animated transform, so content already lined up with the view follows it.
#[derive(Clone)]
pub struct Participant {
    pub surface: SurfaceHandle,
    pub base: Transform,
}

impl Participant {
    pub fn new(surface: SurfaceHandle) -> Self {
        Self::with_base(surface, Transform::identity())
    }

    pub fn with_base(surface: SurfaceHandle, base: Transform) -> Self {
        Self { surface, base }
    }
}

pub struct NavigationAnimationController {
    easing: EasingType,
    state: AnimationState,
    participants: Vec<Participant>,
    tween: Option<Tween<Transform>>,
    current: Transform,
    completions: usize,
}

impl NavigationAnimationController {
    pub fn new(easing: EasingType) -> Self {
        Self {
            easing,
            state: AnimationState::Idle,
            participants: Vec::new(),
            tween: None,
            current: Transform::identity(),
            completions: 0,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AnimationState::Running
    }

    pub fn current_transform(&self) -> Transform {
        self.current
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Number of animations that ran to completion
    pub fn completion_count(&self) -> usize {
        self.completions
    }

    /// Starts animating `participants` from a pure translation to
    /// `scale_factor` plus `to_translation`. A zero duration applies the end
    /// state and completes before returning.
    pub fn start(
        &mut self,
        participants: Vec<Participant>,
        scale_factor: f64,
        from_translation: Point,
        to_translation: Point,
        duration_millis: u64,
        now: Instant,
    ) -> AnimationFrame {
        let from = Transform::translation(from_translation);
        let to = Transform::new(scale_factor, to_translation);
        debug!(
            "navigation start: {} participants, factor {}, {} ms",
            participants.len(),
            scale_factor,
            duration_millis
        );

        self.participants = participants;
        self.tween = Some(Tween::new(
            from,
            to,
            Duration::from_millis(duration_millis),
            self.easing,
            now,
        ));
        self.state = AnimationState::Running;
        self.current = from;
        self.apply(from);
        self.step(now)
    }

    /// Retargets a running animation, restarting the time window from the
    /// transform reached so far. Returns `None` unless running.
    pub fn extend(
        &mut self,
        scale_factor: f64,
        to_translation: Point,
        duration_millis: u64,
        now: Instant,
    ) -> Option<AnimationFrame> {
        if !self.is_running() {
            return None;
        }
        let from = self
            .tween
            .as_ref()
            .map(|tween| tween.value_at(now))
            .unwrap_or(self.current);
        let to = Transform::new(scale_factor, to_translation);
        trace!("navigation extended to factor {}", scale_factor);

        self.tween = Some(Tween::new(
            from,
            to,
            Duration::from_millis(duration_millis),
            self.easing,
            now,
        ));
        self.current = from;
        self.apply(from);
        Some(self.step(now))
    }

    /// Advances a running animation. The frame with `completed` set is
    /// produced exactly once per animation.
    pub fn tick(&mut self, now: Instant) -> Option<AnimationFrame> {
        if !self.is_running() {
            return None;
        }
        Some(self.step(now))
    }

    fn step(&mut self, now: Instant) -> AnimationFrame {
        let Some(tween) = self.tween.as_ref() else {
            self.state = AnimationState::Idle;
            return AnimationFrame {
                transform: self.current,
                progress: 1.0,
                completed: false,
            };
        };
        let progress = tween.progress(now);
        let transform = tween.value_at(now);
        let completed = tween.is_finished(now);

        self.current = transform;
        self.apply(transform);
        if completed {
            self.state = AnimationState::Completed;
            self.completions += 1;
            debug!("navigation completed at factor {}", transform.scale());
        }
        AnimationFrame {
            transform,
            progress,
            completed,
        }
    }

    /// Stops the animation where it is; returns whether one was running
    pub fn cancel(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = AnimationState::Idle;
        debug!("navigation cancelled at factor {}", self.current.scale());
        true
    }

    /// Forgets the participants after the caller has settled them
    pub fn release(&mut self) -> Vec<Participant> {
        if self.is_running() {
            self.state = AnimationState::Idle;
        }
        std::mem::take(&mut self.participants)
    }

    fn apply(&self, transform: Transform) {
        for participant in &self.participants {
            participant
                .surface
                .borrow_mut()
                .set_transform(participant.base.then(&transform));
        }
    }
}

impl Default for NavigationAnimationController {
    fn default() -> Self {
        Self::new(EasingType::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::surface::{MemorySurfaceFactory, SurfaceFactory, SurfaceKind};

    fn participants(count: usize) -> Vec<SurfaceHandle> {
        let factory = MemorySurfaceFactory::new();
        (0..count).map(|_| factory.create(SurfaceKind::Scale)).collect()
    }

    fn moving(surfaces: &[SurfaceHandle]) -> Vec<Participant> {
        surfaces.iter().cloned().map(Participant::new).collect()
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_zero_duration_completes_synchronously() {
        let surfaces = participants(2);
        let mut controller = NavigationAnimationController::new(EasingType::Linear);

        let frame = controller.start(
            moving(&surfaces),
            2.0,
            Point::zero(),
            Point::new(-10.0, 5.0),
            0,
            Instant::now(),
        );
        assert!(frame.completed);
        assert_eq!(controller.state(), AnimationState::Completed);
        assert_eq!(controller.completion_count(), 1);
        for surface in &surfaces {
            assert_eq!(
                surface.borrow().state().transform,
                Transform::new(2.0, Point::new(-10.0, 5.0))
            );
        }
        assert!(controller.tick(Instant::now()).is_none());
    }

    #[test]
    fn test_tick_interpolates_all_participants() {
        let surfaces = participants(3);
        let mut controller = NavigationAnimationController::new(EasingType::Linear);
        let start = Instant::now();

        controller.start(moving(&surfaces), 3.0, Point::zero(), Point::new(100.0, 0.0), 100, start);
        let frame = controller.tick(start + ms(50)).unwrap();
        assert!(!frame.completed);
        assert!((frame.progress - 0.5).abs() < 1e-9);
        assert!((frame.transform.scale() - 2.0).abs() < 1e-9);
        for surface in &surfaces {
            assert_eq!(surface.borrow().state().transform, frame.transform);
        }

        let frame = controller.tick(start + ms(150)).unwrap();
        assert!(frame.completed);
        assert_eq!(frame.transform, Transform::new(3.0, Point::new(100.0, 0.0)));
    }

    #[test]
    fn test_extend_completes_once_with_final_target() {
        let surfaces = participants(1);
        let mut controller = NavigationAnimationController::new(EasingType::EaseOut);
        let start = Instant::now();

        controller.start(moving(&surfaces), 2.0, Point::zero(), Point::zero(), 250, start);
        controller.tick(start + ms(100));
        let frame = controller.extend(4.0, Point::zero(), 250, start + ms(100)).unwrap();
        assert!(!frame.completed);
        assert!(frame.transform.scale() > 1.0 && frame.transform.scale() < 2.0);

        assert!(!controller.tick(start + ms(300)).unwrap().completed);
        let last = controller.tick(start + ms(400)).unwrap();
        assert!(last.completed);
        assert_eq!(last.transform.scale(), 4.0);
        assert!(controller.tick(start + ms(500)).is_none());

        assert_eq!(controller.completion_count(), 1);
        assert_eq!(surfaces[0].borrow().state().transform.scale(), 4.0);
    }

    #[test]
    fn test_participant_base_is_applied_first() {
        let surfaces = participants(2);
        let base = Transform::new(0.5, Point::new(4.0, -2.0));
        let moving = vec![
            Participant::new(surfaces[0].clone()),
            Participant::with_base(surfaces[1].clone(), base),
        ];
        let mut controller = NavigationAnimationController::new(EasingType::Linear);

        let frame = controller.start(moving, 2.0, Point::zero(), Point::new(10.0, 0.0), 0, Instant::now());
        assert_eq!(surfaces[0].borrow().state().transform, frame.transform);

        let composed = surfaces[1].borrow().state().transform;
        let p = Point::new(8.0, 6.0);
        let expected = frame.transform.apply(&base.apply(&p));
        assert!((composed.apply(&p).x - expected.x).abs() < 1e-9);
        assert!((composed.apply(&p).y - expected.y).abs() < 1e-9);
        assert_eq!(controller.release().len(), 2);
        assert!(controller.participants().is_empty());
    }

    #[test]
    fn test_extend_requires_running_animation() {
        let mut controller = NavigationAnimationController::default();
        assert!(controller.extend(2.0, Point::zero(), 100, Instant::now()).is_none());
    }

    #[test]
    fn test_cancel_leaves_transform_in_place() {
        let surfaces = participants(1);
        let mut controller = NavigationAnimationController::new(EasingType::Linear);
        let start = Instant::now();

        controller.start(moving(&surfaces), 2.0, Point::zero(), Point::zero(), 100, start);
        controller.tick(start + ms(50));
        assert!(controller.cancel());
        assert!(!controller.cancel());
        assert_eq!(controller.state(), AnimationState::Idle);
        assert!((surfaces[0].borrow().state().transform.scale() - 1.5).abs() < 1e-9);
        assert_eq!(controller.current_transform(), surfaces[0].borrow().state().transform);
        assert!(controller.tick(start + ms(200)).is_none());
        assert_eq!(controller.completion_count(), 0);
    }

    #[test]
    fn test_tween_progress_clamps() {
        let start = Instant::now();
        let tween = Tween::new(0.0, 10.0, ms(100), EasingType::Linear, start);
        assert_eq!(tween.progress(start + ms(500)), 1.0);
        assert_eq!(tween.value_at(start + ms(500)), 10.0);
        assert!((tween.value_at(start + ms(25)) - 2.5).abs() < 1e-9);
        assert!(Tween::new(0.0, 1.0, Duration::ZERO, EasingType::Linear, start).is_finished(start));
    }
}
