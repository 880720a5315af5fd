//! Attribute key constants for Attrs access.
//!
//! Avoid string typos, enable IDE autocomplete.
//! Usage: `clip.attrs().count(A_ANIMATION_SETS)`

/// Human-readable name
pub const A_NAME: &str = "name";

/// Animation sets bound to a film clip (element_array). Each one adds
/// settle time to the export pacing.
pub const A_ANIMATION_SETS: &str = "animationSets";

/// Flex controller table. Element attributes of its children point back
/// into the model (`gameModel`) and are never followed.
pub const A_GLOBAL_FLEX_CONTROLLERS: &str = "globalFlexControllers";
