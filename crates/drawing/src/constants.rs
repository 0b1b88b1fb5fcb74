/// Default tile size for the page bitmap's dirty tracking.
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// Maximum distance (pixels) between a quadratic curve and its flattened polyline.
pub const FLATTEN_TOLERANCE: f32 = 0.25;

/// Upper bound on line segments emitted per flattened quadratic.
pub const MAX_CURVE_SEGMENTS: u32 = 32;

/// Extra pixels added around a repaint rectangle to cover anti-aliased edges.
pub const REPAINT_MARGIN: f32 = 1.0;

/// Capacity of a session's event channel before slow receivers start lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Rows painted per band when a whole page is rendered for export.
pub const EXPORT_BAND_HEIGHT: u32 = 256;

/// Smallest zoom factor a viewport accepts, whatever the configured limit.
pub const MIN_ZOOM_FLOOR: f32 = 0.01;
