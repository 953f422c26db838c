/// Occupancy filtering tunables

/// Alpha value above which a pixel counts as foreground (renders use a
/// transparent background film)
pub const FOREGROUND_ALPHA_CUTOFF: u8 = 8;

/// Per-channel tolerance for the colour fallback test on images
/// without an alpha channel
pub const FOREGROUND_COLOR_TOLERANCE: u8 = 8;

/// Domain-tuned occupancy threshold for plant collections
pub const PLANTS_OCCUPANCY_THRESH: f64 = 0.05;

/// Domain-tuned occupancy threshold for food collections
pub const FOOD_OCCUPANCY_THRESH: f64 = 0.03;
