//! Scale snapping against an optional list of fixed resolutions.
//!
//! A resolution is world units per pixel, the inverse of a scale. Resolution
//! lists are kept sorted descending, so index 0 is the coarsest level and
//! higher indices zoom further in.

use crate::core::constants::SCALE_EPSILON;
use serde::{Deserialize, Serialize};

/// How a requested scale is mapped onto the configured resolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomOption {
    /// Apply the clamped scale as requested, ignoring resolutions
    #[default]
    Exact,
    /// Nearest bracketing resolution
    LevelClosest,
    /// Coarser bracketing resolution, so a target bounds stays fully visible
    LevelFit,
    /// Like `LevelClosest`, but always move at least one level
    LevelChange,
}

/// Everything the snapper needs to know about the viewport it serves
#[derive(Debug, Clone, Copy)]
pub struct SnapContext<'a> {
    /// Sorted descending
    pub resolutions: &'a [f64],
    pub minimum_scale: Option<f64>,
    pub maximum_scale: f64,
    pub current_index: Option<usize>,
    pub current_scale: f64,
}

/// Result of snapping: the scale to apply and the resolution index it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapped {
    pub scale: f64,
    pub index: Option<usize>,
}

impl Snapped {
    fn unsnapped(scale: f64) -> Self {
        Self { scale, index: None }
    }
}

/// Maps `desired` onto the scale that should actually be applied.
pub fn snap(desired: f64, option: ZoomOption, ctx: &SnapContext<'_>) -> Snapped {
    let mut clamped = desired.min(ctx.maximum_scale);
    if let Some(min) = ctx.minimum_scale {
        clamped = clamped.max(min);
    }

    if ctx.resolutions.is_empty() || option == ZoomOption::Exact {
        return Snapped::unsnapped(clamped);
    }

    let Some((first, last)) = valid_range(ctx) else {
        return Snapped::unsnapped(clamped);
    };

    let resolutions = ctx.resolutions;
    let screen = 1.0 / clamped;
    let mut index = select_index(resolutions, first, last, screen, option);

    if option == ZoomOption::LevelChange && Some(index) == ctx.current_index {
        if desired > ctx.current_scale + SCALE_EPSILON {
            index = (index + 1).min(last);
        } else if desired < ctx.current_scale - SCALE_EPSILON {
            index = index.saturating_sub(1).max(first);
        }
    }

    Snapped {
        scale: 1.0 / resolutions[index],
        index: Some(index),
    }
}

/// Contiguous index range whose resolutions lie in `[1/max_scale, 1/min_scale]`
fn valid_range(ctx: &SnapContext<'_>) -> Option<(usize, usize)> {
    let finest = 1.0 / ctx.maximum_scale;
    let coarsest = ctx
        .minimum_scale
        .map(|min| 1.0 / min)
        .unwrap_or(f64::INFINITY);

    let first = ctx
        .resolutions
        .iter()
        .position(|&r| r <= coarsest * (1.0 + SCALE_EPSILON))?;
    let last = ctx
        .resolutions
        .iter()
        .rposition(|&r| r >= finest * (1.0 - SCALE_EPSILON))?;

    (first <= last).then_some((first, last))
}

fn select_index(
    resolutions: &[f64],
    first: usize,
    last: usize,
    screen: f64,
    option: ZoomOption,
) -> usize {
    if screen >= resolutions[first] {
        return first;
    }
    if screen <= resolutions[last] {
        return last;
    }

    for i in first..last {
        let upper = resolutions[i];
        let lower = resolutions[i + 1];
        if screen > upper || screen < lower {
            continue;
        }
        if same_resolution(screen, upper) {
            return i;
        }
        if same_resolution(screen, lower) {
            return i + 1;
        }
        if option == ZoomOption::LevelFit {
            return i;
        }
        return if upper / screen > screen / lower { i + 1 } else { i };
    }

    last
}

fn same_resolution(a: f64, b: f64) -> bool {
    (a - b).abs() <= b * SCALE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOLUTIONS: [f64; 4] = [8.0, 4.0, 2.0, 1.0];

    fn ctx(current_index: Option<usize>, current_scale: f64) -> SnapContext<'static> {
        SnapContext {
            resolutions: &RESOLUTIONS,
            minimum_scale: None,
            maximum_scale: 1000.0,
            current_index,
            current_scale,
        }
    }

    #[test]
    fn test_exact_ignores_resolutions() {
        let snapped = snap(0.3, ZoomOption::Exact, &ctx(Some(2), 0.5));
        assert_eq!(snapped, Snapped { scale: 0.3, index: None });
    }

    #[test]
    fn test_closest_uses_bracket_rule() {
        // 1/0.3 = 3.33 lies between 4 and 2; 4/3.33 = 1.2 is not > 3.33/2 = 1.67
        let snapped = snap(0.3, ZoomOption::LevelClosest, &ctx(Some(2), 0.5));
        assert_eq!(snapped.index, Some(1));
        assert_eq!(snapped.scale, 0.25);

        // 1/0.45 = 2.22 lies between 4 and 2 and is closer to 2
        let snapped = snap(0.45, ZoomOption::LevelClosest, &ctx(None, 0.0));
        assert_eq!(snapped.index, Some(2));
        assert_eq!(snapped.scale, 0.5);
    }

    #[test]
    fn test_closest_is_idempotent() {
        for desired in [0.01, 0.2, 0.3, 0.45, 0.7, 3.0] {
            let once = snap(desired, ZoomOption::LevelClosest, &ctx(None, 0.0));
            let twice = snap(once.scale, ZoomOption::LevelClosest, &ctx(once.index, once.scale));
            assert_eq!(once, twice, "snapping {desired} twice");
        }
    }

    #[test]
    fn test_fit_rounds_to_coarser() {
        let snapped = snap(0.45, ZoomOption::LevelFit, &ctx(None, 0.0));
        assert_eq!(snapped.index, Some(1));
        assert_eq!(snapped.scale, 0.25);
    }

    #[test]
    fn test_out_of_range_picks_extremes() {
        assert_eq!(snap(0.01, ZoomOption::LevelClosest, &ctx(None, 0.0)).index, Some(0));
        assert_eq!(snap(50.0, ZoomOption::LevelClosest, &ctx(None, 0.0)).index, Some(3));
    }

    #[test]
    fn test_level_change_forces_one_step() {
        // 0.55 snaps back to index 2 (scale 0.5); zooming in moves to index 3
        let snapped = snap(0.55, ZoomOption::LevelChange, &ctx(Some(2), 0.5));
        assert_eq!(snapped.index, Some(3));
        assert_eq!(snapped.scale, 1.0);

        let snapped = snap(0.45, ZoomOption::LevelChange, &ctx(Some(2), 0.5));
        assert_eq!(snapped.index, Some(1));

        // already at the finest level
        let snapped = snap(1.2, ZoomOption::LevelChange, &ctx(Some(3), 1.0));
        assert_eq!(snapped.index, Some(3));
    }

    #[test]
    fn test_scale_limits_restrict_range() {
        let context = SnapContext {
            resolutions: &RESOLUTIONS,
            minimum_scale: Some(0.25),
            maximum_scale: 0.5,
            current_index: None,
            current_scale: 0.0,
        };
        assert_eq!(snap(0.01, ZoomOption::LevelClosest, &context).scale, 0.25);
        assert_eq!(snap(10.0, ZoomOption::LevelClosest, &context).scale, 0.5);
        assert_eq!(snap(10.0, ZoomOption::Exact, &context).scale, 0.5);
    }

    #[test]
    fn test_empty_range_returns_clamped() {
        let context = SnapContext {
            resolutions: &RESOLUTIONS,
            minimum_scale: Some(2.0),
            maximum_scale: 4.0,
            current_index: None,
            current_scale: 0.0,
        };
        let snapped = snap(3.0, ZoomOption::LevelClosest, &context);
        assert_eq!(snapped, Snapped { scale: 3.0, index: None });
    }
}
