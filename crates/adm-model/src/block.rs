//! Block formats: time-ranged parameter sets owned by a channel format.
//!
//! Times are integer nanoseconds from the start of the programme. A block
//! covers the half-open range `[start, start + duration)`.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::id::EntityId;

/// Nanoseconds from programme start.
pub type Nanos = u64;

/// A polar object position.
///
/// - **Azimuth**: -180° to +180° (0° = front, positive = left, per ADM)
/// - **Elevation**: -90° to +90° (0° = ear level)
/// - **Distance**: 0.0 to 1.0 (normalized)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub azimuth: f64,
    pub elevation: f64,
    pub distance: f64,
}

impl Position {
    /// Creates a new position with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidAzimuth`], [`ModelError::InvalidElevation`]
    /// or [`ModelError::InvalidDistance`] for out-of-range components.
    pub fn new(azimuth: f64, elevation: f64, distance: f64) -> Result<Self> {
        let position = Self {
            azimuth,
            elevation,
            distance,
        };
        position.validate()?;
        Ok(position)
    }

    /// Front centre at unit distance.
    pub fn front() -> Self {
        Self {
            azimuth: 0.0,
            elevation: 0.0,
            distance: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(-180.0..=180.0).contains(&self.azimuth) {
            return Err(ModelError::InvalidAzimuth(self.azimuth));
        }
        if !(-90.0..=90.0).contains(&self.elevation) {
            return Err(ModelError::InvalidElevation(self.elevation));
        }
        if !(0.0..=1.0).contains(&self.distance) {
            return Err(ModelError::InvalidDistance(self.distance));
        }
        Ok(())
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::front()
    }
}

/// The parameter payload of one block.
///
/// Compaction in the write cursor compares payloads with `==`, so two
/// payloads are "unchanged" only if every field is bit-for-bit equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockParams {
    pub position: Position,
    /// Linear gain.
    pub gain: f64,
    /// Extent in degrees (width/height) and normalized depth.
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl BlockParams {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            gain: 1.0,
            width: 0.0,
            height: 0.0,
            depth: 0.0,
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_extent(mut self, width: f64, height: f64, depth: f64) -> Self {
        self.width = width;
        self.height = height;
        self.depth = depth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.position.validate()?;
        if !self.gain.is_finite() {
            return Err(ModelError::InvalidGain(self.gain));
        }
        for extent in [self.width, self.height, self.depth] {
            if !extent.is_finite() || extent < 0.0 {
                return Err(ModelError::InvalidExtent(extent));
            }
        }
        Ok(())
    }
}

impl Default for BlockParams {
    fn default() -> Self {
        Self::new(Position::default())
    }
}

/// One time-ranged parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockFormat {
    pub(crate) id: EntityId,
    pub start: Nanos,
    pub duration: Nanos,
    pub params: BlockParams,
}

impl BlockFormat {
    /// A block with a placeholder id; the graph assigns the real one on insert.
    pub fn new(start: Nanos, duration: Nanos, params: BlockParams) -> Self {
        Self {
            id: EntityId::Temporary(0),
            start,
            duration,
            params,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Exclusive end time.
    pub fn end(&self) -> Nanos {
        self.start.saturating_add(self.duration)
    }

    /// Whether `t` lies in `[start, end)`.
    pub fn contains(&self, t: Nanos) -> bool {
        t >= self.start && t < self.end()
    }
}

/// Check that `blocks` are strictly ordered by start and do not overlap.
///
/// Returns the index of the first offending block.
pub fn first_order_violation(blocks: &[BlockFormat]) -> Option<usize> {
    blocks
        .windows(2)
        .position(|w| w[1].start <= w[0].start || w[1].start < w[0].end())
        .map(|i| i + 1)
}
