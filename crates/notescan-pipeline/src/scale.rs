//! Sheet scale: conversion between interline fractions and pixels.

use serde::{Deserialize, Serialize};

use crate::types::{Fraction, GlyphError};

/// The global scale of a sheet.
///
/// The interline is the vertical distance, in pixels, between two
/// consecutive lines of a staff. Every tolerance of the pipeline is
/// expressed as a [`Fraction`] of it, so the same configuration applies
/// to sheets scanned at any resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    interline: u32,
}

impl Scale {
    /// Create a scale for the given interline.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::InvalidConfig`] if `interline` is zero.
    pub fn new(interline: u32) -> Result<Self, GlyphError> {
        if interline == 0 {
            return Err(GlyphError::InvalidConfig(
                "interline must be at least one pixel".to_string(),
            ));
        }
        Ok(Self { interline })
    }

    /// Interline value, in pixels.
    #[must_use]
    pub const fn interline(&self) -> u32 {
        self.interline
    }

    /// Convert an interline fraction to a (rounded) pixel distance.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_pixels(&self, fraction: Fraction) -> i32 {
        (fraction.value() * f64::from(self.interline)).round() as i32
    }
}
