//! Family-member to inventory-category mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::sizes::{AdultSize, KidsSize, Size, SizeBand, SizeChoice};

/// A family member a garment is ordered for.
///
/// Declaration order is the order members are listed in a combo and the
/// order `selectedSizes` is walked during acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Member {
    Father,
    Mother,
    Son,
    Daughter,
}

impl Member {
    pub const ALL: [Member; 4] = [Member::Father, Member::Mother, Member::Son, Member::Daughter];

    pub fn label(self) -> &'static str {
        match self {
            Member::Father => "Father",
            Member::Mother => "Mother",
            Member::Son => "Son",
            Member::Daughter => "Daughter",
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inventory partition of a design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Men,
    Women,
    Boys,
    Girls,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Men, Category::Women, Category::Boys, Category::Girls];

    pub fn key(self) -> &'static str {
        match self {
            Category::Men => "men",
            Category::Women => "women",
            Category::Boys => "boys",
            Category::Girls => "girls",
        }
    }

    pub fn is_adult(self) -> bool {
        matches!(self, Category::Men | Category::Women)
    }

    /// Sizes stocked in this category, in display order.
    pub fn sizes(self) -> Vec<Size> {
        if self.is_adult() {
            AdultSize::ALL.iter().copied().map(Size::Adult).collect()
        } else {
            KidsSize::ALL.iter().copied().map(Size::Kids).collect()
        }
    }

    pub fn accepts(self, size: Size) -> bool {
        match size {
            Size::Adult(_) => self.is_adult(),
            Size::Kids(_) => !self.is_adult(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Named subset of family members ordered together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComboType {
    #[serde(rename = "F-M-S-D")]
    FullFamily,
    #[serde(rename = "F-S")]
    FatherSon,
    #[serde(rename = "M-D")]
    MotherDaughter,
    #[serde(rename = "F-M")]
    Couple,
}

impl ComboType {
    pub const ALL: [ComboType; 4] = [
        ComboType::FullFamily,
        ComboType::FatherSon,
        ComboType::MotherDaughter,
        ComboType::Couple,
    ];

    /// Storage identifier, e.g. `F-M-S-D`.
    pub fn code(self) -> &'static str {
        match self {
            ComboType::FullFamily => "F-M-S-D",
            ComboType::FatherSon => "F-S",
            ComboType::MotherDaughter => "M-D",
            ComboType::Couple => "F-M",
        }
    }

    /// Storefront display name.
    pub fn label(self) -> &'static str {
        match self {
            ComboType::FullFamily => "Complete Family Set",
            ComboType::FatherSon => "Father & Son",
            ComboType::MotherDaughter => "Mother & Daughter",
            ComboType::Couple => "Couple Set (M/F)",
        }
    }
}

impl fmt::Display for ComboType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Maps a family member to the category their garment is drawn from.
pub fn member_to_category(member: Member) -> Category {
    match member {
        Member::Father => Category::Men,
        Member::Mother => Category::Women,
        Member::Son => Category::Boys,
        Member::Daughter => Category::Girls,
    }
}

/// Members covered by a combo, in listing order.
pub fn combo_members(combo: ComboType) -> &'static [Member] {
    match combo {
        ComboType::FullFamily => &[Member::Father, Member::Mother, Member::Son, Member::Daughter],
        ComboType::FatherSon => &[Member::Father, Member::Son],
        ComboType::MotherDaughter => &[Member::Mother, Member::Daughter],
        ComboType::Couple => &[Member::Father, Member::Mother],
    }
}

/// Whether `choice` is selectable for `member`. Opting out is always valid.
pub fn is_valid_choice(member: Member, choice: SizeChoice) -> bool {
    match choice {
        SizeChoice::NotApplicable => true,
        SizeChoice::Size(size) => member_to_category(member).accepts(size),
    }
}
