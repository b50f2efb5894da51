use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel stored in `selectedSizes` when a family member opts out.
pub const NOT_APPLICABLE: &str = "N/A";

/// A closed, ordered set of size labels.
///
/// Implemented by [`AdultSize`] and [`KidsSize`]; [`SizeStock`](super::SizeStock)
/// is generic over it so both stock rows share one shape.
pub trait SizeBand: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// Every size in display order.
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn parse(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|size| size.label() == label)
    }
}

/// Sizes for the `men` and `women` categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdultSize {
    M,
    L,
    Xl,
    Xxl,
    ThreeXl,
}

impl SizeBand for AdultSize {
    const ALL: &'static [Self] = &[Self::M, Self::L, Self::Xl, Self::Xxl, Self::ThreeXl];

    fn label(self) -> &'static str {
        match self {
            Self::M => "M",
            Self::L => "L",
            Self::Xl => "XL",
            Self::Xxl => "XXL",
            Self::ThreeXl => "3XL",
        }
    }
}

/// Age bands for the `boys` and `girls` categories. There is no "8-9" band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KidsSize {
    Age0To1,
    Age1To2,
    Age2To3,
    Age3To4,
    Age4To5,
    Age5To6,
    Age6To7,
    Age7To8,
    Age9To10,
    Age11To12,
    Age13To14,
}

impl SizeBand for KidsSize {
    const ALL: &'static [Self] = &[
        Self::Age0To1,
        Self::Age1To2,
        Self::Age2To3,
        Self::Age3To4,
        Self::Age4To5,
        Self::Age5To6,
        Self::Age6To7,
        Self::Age7To8,
        Self::Age9To10,
        Self::Age11To12,
        Self::Age13To14,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Age0To1 => "0-1",
            Self::Age1To2 => "1-2",
            Self::Age2To3 => "2-3",
            Self::Age3To4 => "3-4",
            Self::Age4To5 => "4-5",
            Self::Age5To6 => "5-6",
            Self::Age6To7 => "6-7",
            Self::Age7To8 => "7-8",
            Self::Age9To10 => "9-10",
            Self::Age11To12 => "11-12",
            Self::Age13To14 => "13-14",
        }
    }
}

/// Any concrete size token. The adult and kids label sets are disjoint, so a
/// bare label parses unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Size {
    Adult(AdultSize),
    Kids(KidsSize),
}

impl Size {
    pub fn parse(label: &str) -> Option<Self> {
        AdultSize::parse(label)
            .map(Size::Adult)
            .or_else(|| KidsSize::parse(label).map(Size::Kids))
    }

    pub fn label(self) -> &'static str {
        match self {
            Size::Adult(size) => size.label(),
            Size::Kids(size) => size.label(),
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<AdultSize> for Size {
    fn from(size: AdultSize) -> Self {
        Size::Adult(size)
    }
}

impl From<KidsSize> for Size {
    fn from(size: KidsSize) -> Self {
        Size::Kids(size)
    }
}

/// One member's entry in an order's size selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeChoice {
    /// The member opted out; no stock effect.
    NotApplicable,
    Size(Size),
}

impl SizeChoice {
    pub fn parse(label: &str) -> Option<Self> {
        if label == NOT_APPLICABLE {
            return Some(SizeChoice::NotApplicable);
        }
        Size::parse(label).map(SizeChoice::Size)
    }

    pub fn label(self) -> &'static str {
        match self {
            SizeChoice::NotApplicable => NOT_APPLICABLE,
            SizeChoice::Size(size) => size.label(),
        }
    }

    pub fn size(self) -> Option<Size> {
        match self {
            SizeChoice::NotApplicable => None,
            SizeChoice::Size(size) => Some(size),
        }
    }
}

impl fmt::Display for SizeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Size> for SizeChoice {
    fn from(size: Size) -> Self {
        SizeChoice::Size(size)
    }
}

impl From<AdultSize> for SizeChoice {
    fn from(size: AdultSize) -> Self {
        SizeChoice::Size(Size::Adult(size))
    }
}

impl From<KidsSize> for SizeChoice {
    fn from(size: KidsSize) -> Self {
        SizeChoice::Size(Size::Kids(size))
    }
}

impl Serialize for SizeChoice {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for SizeChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        SizeChoice::parse(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown size token: {label}")))
    }
}
