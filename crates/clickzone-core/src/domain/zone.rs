//! Target zone and the click coordinate transform.
//!
//! A physical click at `(cx, cy)` on a `sw × sh` screen is mapped into the
//! zone by keeping its relative position:
//!
//! ```text
//! fx = cx / sw            (1 - fx when mirrored horizontally)
//! fy = cy / sh            (1 - fy when mirrored vertically)
//! x' = left + fx * width
//! y' = top  + fy * height
//! ```
//!
//! The zone is not required to fit on the physical screen.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::event::Point;

/// Errors that make a zone or screen unusable for remapping.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneError {
    #[error("target zone width must be greater than zero")]
    ZeroWidth,

    #[error("target zone height must be greater than zero")]
    ZeroHeight,

    /// The platform reported a screen with no area.
    #[error("screen size {width}x{height} is not usable")]
    EmptyScreen { width: i32, height: i32 },
}

/// Physical screen dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl ScreenSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// # Errors
    ///
    /// Returns [`ZoneError::EmptyScreen`] if either dimension is not positive.
    pub fn validate(&self) -> Result<(), ZoneError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ZoneError::EmptyScreen {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// The rectangle that physical clicks are remapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetZone {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub left: u32,
    #[serde(default)]
    pub top: u32,
    #[serde(default)]
    pub mirror_horizontal: bool,
    #[serde(default)]
    pub mirror_vertical: bool,
}

impl TargetZone {
    /// Creates an unmirrored zone.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::ZeroWidth`] or [`ZoneError::ZeroHeight`] for an empty zone.
    pub fn new(width: u32, height: u32, left: u32, top: u32) -> Result<Self, ZoneError> {
        let zone = Self {
            width,
            height,
            left,
            top,
            mirror_horizontal: false,
            mirror_vertical: false,
        };
        zone.validate()?;
        Ok(zone)
    }

    pub fn with_mirroring(mut self, horizontal: bool, vertical: bool) -> Self {
        self.mirror_horizontal = horizontal;
        self.mirror_vertical = vertical;
        self
    }

    /// # Errors
    ///
    /// Returns [`ZoneError::ZeroWidth`] or [`ZoneError::ZeroHeight`] for an empty zone.
    pub fn validate(&self) -> Result<(), ZoneError> {
        if self.width == 0 {
            return Err(ZoneError::ZeroWidth);
        }
        if self.height == 0 {
            return Err(ZoneError::ZeroHeight);
        }
        Ok(())
    }

    /// Maps a cursor position on `screen` into the zone.
    ///
    /// `screen` must have passed [`ScreenSize::validate`].  Fractional results
    /// are truncated toward zero.
    pub fn map(&self, cursor: Point, screen: ScreenSize) -> Point {
        let mut fx = f64::from(cursor.x) / f64::from(screen.width);
        let mut fy = f64::from(cursor.y) / f64::from(screen.height);
        if self.mirror_horizontal {
            fx = 1.0 - fx;
        }
        if self.mirror_vertical {
            fy = 1.0 - fy;
        }

        let x = f64::from(self.left) + fx * f64::from(self.width);
        let y = f64::from(self.top) + fy * f64::from(self.height);
        Point::new(x as i32, y as i32)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
