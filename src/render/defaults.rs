//! Default sizes and settings for the output document

/// Pixels per drawing unit (1cm at 72dpi).
pub const SCALE: f64 = 28.35;

/// Output canvas, drawing origin at its center.
pub const CANVAS_WIDTH: u32 = 500;
pub const CANVAS_HEIGHT: u32 = 500;

/// Grid line spacing in SVG pixels, one drawing unit regardless of the
/// document scale.
pub const GRID_STEP: f64 = 28.35;

/// Default stroke width in pixels when no line-width option applies.
pub const STROKE_WIDTH: f64 = 1.0;

/// Default font size in pixels for node text.
pub const FONT_SIZE: u32 = 12;
