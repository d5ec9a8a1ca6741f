//! Canvas coordinate math: screen-to-native transform and drag rectangle normalization.

use serde::{Deserialize, Serialize};

/// Drags with either extent at or below this many canvas pixels are discarded.
pub const MIN_ZONE_EXTENT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Native pixel dimensions of the media behind the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// On-screen box the canvas is laid out into, in display units (CSS pixels, terminal cells).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left
            && p.x < self.left + self.width
            && p.y >= self.top
            && p.y < self.top + self.height
    }
}

/// Backing resolution of the overlay canvas plus where it is currently displayed.
///
/// The backing resolution follows the media's native size, so it stays unknown until the
/// media metadata has been read. Until then [`CanvasGeometry::to_native`] yields nothing
/// and no drag can start.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasGeometry {
    native: Option<Size>,
    bounds: ScreenRect,
}

impl CanvasGeometry {
    pub fn new(native: Option<Size>, bounds: ScreenRect) -> Self {
        Self { native, bounds }
    }

    pub fn native(&self) -> Option<Size> {
        self.native.filter(|s| !s.is_empty())
    }

    pub fn bounds(&self) -> ScreenRect {
        self.bounds
    }

    pub fn set_native(&mut self, native: Option<Size>) {
        self.native = native;
    }

    pub fn set_bounds(&mut self, bounds: ScreenRect) {
        self.bounds = bounds;
    }

    pub fn is_ready(&self) -> bool {
        self.scale().is_some()
    }

    /// Per-axis `native / displayed` ratio.
    pub fn scale(&self) -> Option<(f64, f64)> {
        let native = self.native()?;
        if self.bounds.width <= 0.0 || self.bounds.height <= 0.0 {
            return None;
        }
        Some((
            native.width as f64 / self.bounds.width,
            native.height as f64 / self.bounds.height,
        ))
    }

    /// Maps a pointer position in display units into canvas-native pixels.
    pub fn to_native(&self, pointer: Point) -> Option<Point> {
        let (sx, sy) = self.scale()?;
        Some(Point {
            x: (pointer.x - self.bounds.left) * sx,
            y: (pointer.y - self.bounds.top) * sy,
        })
    }

    /// Like [`CanvasGeometry::to_native`], but pins positions outside the canvas to its
    /// nearest edge so the result always lies on the media.
    pub fn to_native_clamped(&self, pointer: Point) -> Option<Point> {
        let native = self.native()?;
        let p = self.to_native(pointer)?;
        Some(Point {
            x: p.x.clamp(0.0, native.width as f64),
            y: p.y.clamp(0.0, native.height as f64),
        })
    }

    /// Inverse of [`CanvasGeometry::to_native`], used by renderers that draw in display units.
    pub fn to_screen(&self, native: Point) -> Option<Point> {
        let (sx, sy) = self.scale()?;
        Some(Point {
            x: native.x / sx + self.bounds.left,
            y: native.y / sy + self.bounds.top,
        })
    }
}

/// Rectangle as dragged: anchored at the drag start, extents may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DragRect {
    pub fn start(at: Point) -> Self {
        Self {
            x: at.x,
            y: at.y,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn resize_to(&mut self, to: Point) {
        self.width = to.x - self.x;
        self.height = to.y - self.y;
    }

    pub fn exceeds_minimum(&self) -> bool {
        self.width.abs() > MIN_ZONE_EXTENT && self.height.abs() > MIN_ZONE_EXTENT
    }

    /// Canonical top-left form with non-negative extents.
    pub fn normalized(&self) -> Rect {
        Rect {
            x: if self.width < 0.0 {
                self.x + self.width
            } else {
                self.x
            },
            y: if self.height < 0.0 {
                self.y + self.height
            } else {
                self.y
            },
            width: self.width.abs(),
            height: self.height.abs(),
        }
    }

    /// Normalizes the drag, or `None` when it is too small to become a zone.
    pub fn finish(&self) -> Option<Rect> {
        self.exceeds_minimum().then(|| self.normalized())
    }
}

/// Normalized rectangle in canvas-native pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Rounds half up, matching the backend's pixel coordinates.
pub fn round_px(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}
