pub mod easing;
pub mod navigation;

// Re-export commonly used types for convenience
pub use easing::EasingType;
pub use navigation::{AnimationFrame, AnimationState, NavigationAnimationController, Participant, Tween};
