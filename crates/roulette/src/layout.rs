use crate::angle::{Angle, FULL_TURN, Precise};
use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack allowed when comparing width totals against a full turn.
const TOLERANCE: f64 = 1e-6;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct PartLabel(String);

crate::impl_string_newtype!(PartLabel);

/// How much of the wheel a part asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PartSize {
    /// An absolute width in degrees.
    Degrees(f64),
    /// A relative weight sharing whatever the fixed parts leave over.
    Flex(f64),
}

impl PartSize {
    fn value(self) -> f64 {
        match self {
            Self::Degrees(v) | Self::Flex(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub label: PartLabel,
    pub size: PartSize,
}

impl Part {
    pub fn new(label: impl Into<String>, size: PartSize) -> Self {
        Self {
            label: PartLabel::new(label),
            size,
        }
    }

    pub fn degrees(label: impl Into<String>, degrees: f64) -> Self {
        Self::new(label, PartSize::Degrees(degrees))
    }

    pub fn flex(label: impl Into<String>, weight: f64) -> Self {
        Self::new(label, PartSize::Flex(weight))
    }
}

/// Resolved `[start, end)` of a part, in degrees measured from the top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartRange {
    pub start: Precise,
    pub end: Precise,
}

impl PartRange {
    pub fn width(&self) -> f64 {
        (self.end - self.start).value()
    }

    pub fn contains(&self, degrees: f64) -> bool {
        self.start.value() <= degrees && degrees <= self.end.value()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Fixed part widths add up to {total}°, more than a full turn")]
    Overflow { total: f64 },
    #[error("{remaining}° of the wheel is left with no flexible part to absorb it")]
    Underflow { remaining: f64 },
    #[error("Part {index} has an invalid size ({value})")]
    InvalidSize { index: usize, value: f64 },
}

/// Partitions a full turn between `sizes`, keeping their order.
///
/// Fixed widths are granted first; flexible parts split what is left in
/// proportion to their weights. The final boundary is pinned to exactly 360°.
pub fn resolve(sizes: &[PartSize]) -> Result<Vec<PartRange>, LayoutError> {
    if let Some((index, size)) = sizes
        .iter()
        .enumerate()
        .find(|(_, s)| !s.value().is_finite() || s.value() < 0.0)
    {
        return Err(LayoutError::InvalidSize {
            index,
            value: size.value(),
        });
    }

    let fixed_total = sizes
        .iter()
        .filter_map(|s| match s {
            PartSize::Degrees(d) => Some(*d),
            PartSize::Flex(_) => None,
        })
        .fold(Precise::ZERO, |acc, d| acc + d);

    if fixed_total.value() > FULL_TURN + TOLERANCE {
        return Err(LayoutError::Overflow {
            total: fixed_total.value(),
        });
    }

    let remaining = (Precise::new(FULL_TURN) - fixed_total).value().max(0.0);
    let weights = sizes.iter().filter_map(|s| match s {
        PartSize::Flex(w) => Some(*w),
        PartSize::Degrees(_) => None,
    });
    // weights are scaled by the largest one so their sum stays finite
    let max_weight = weights.clone().fold(0.0, f64::max);
    let weight_total: f64 = if max_weight > 0.0 {
        weights.map(|w| w / max_weight).sum()
    } else {
        0.0
    };

    if weight_total == 0.0 && remaining > TOLERANCE {
        return Err(LayoutError::Underflow { remaining });
    }

    let mut cursor = Precise::ZERO;
    let mut ranges: Vec<PartRange> = sizes
        .iter()
        .map(|size| {
            let width = match *size {
                PartSize::Degrees(d) => d,
                PartSize::Flex(_) if weight_total == 0.0 => 0.0,
                PartSize::Flex(w) => remaining * (w / max_weight / weight_total),
            };
            let start = cursor;
            cursor = cursor + width;
            PartRange { start, end: cursor }
        })
        .collect();

    if let Some(last) = ranges.last_mut() {
        last.end = Precise::new(FULL_TURN);
    }

    Ok(ranges)
}

/// The resolved wheel: parts in order and the angular range each one owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    parts: Vec<Part>,
    ranges: Vec<PartRange>,
}

impl Layout {
    pub fn new(parts: Vec<Part>) -> Result<Self, LayoutError> {
        let sizes: Vec<PartSize> = parts.iter().map(|p| p.size).collect();
        let ranges = resolve(&sizes)?;
        log::debug!("Laid out {} parts", parts.len());
        Ok(Self { parts, ranges })
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<PartRef<'_>> {
        (index < self.parts.len()).then_some(PartRef {
            layout: self,
            index,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = PartRef<'_>> {
        (0..self.parts.len()).map(|index| PartRef {
            layout: self,
            index,
        })
    }

    pub fn ranges(&self) -> &[PartRange] {
        &self.ranges
    }

    pub fn total_degrees(&self) -> f64 {
        self.ranges.iter().map(PartRange::width).sum()
    }
}

/// A part seen through the layout that owns it.
#[derive(Debug, Clone, Copy)]
pub struct PartRef<'a> {
    layout: &'a Layout,
    index: usize,
}

impl<'a> PartRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn layout(&self) -> &'a Layout {
        self.layout
    }

    pub fn part(&self) -> &'a Part {
        &self.layout.parts[self.index]
    }

    pub fn label(&self) -> &'a PartLabel {
        &self.part().label
    }

    pub fn range(&self) -> PartRange {
        self.layout.ranges[self.index]
    }

    pub fn start_angle(&self) -> Angle {
        Angle::from_degrees(self.range().start.value(), true)
    }

    pub fn end_angle(&self) -> Angle {
        Angle::from_degrees(self.range().end.value(), true)
    }

    /// Fraction of the wheel this part covers.
    pub fn share(&self) -> f64 {
        self.range().width() / self.layout.total_degrees()
    }
}
