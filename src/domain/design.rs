use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::combo::Category;
use super::sizes::{AdultSize, KidsSize, Size, SizeBand};

/// Stock counts for every size of one category.
///
/// Always holds a cell for each size in `S::ALL`; sizes missing from stored
/// data read as 0 and negative stored counts are clamped to 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeStock<S: SizeBand> {
    counts: BTreeMap<S, u32>,
}

impl<S: SizeBand> SizeStock<S> {
    pub fn empty() -> Self {
        Self {
            counts: S::ALL.iter().map(|size| (*size, 0)).collect(),
        }
    }

    /// Builds a row from explicit counts; every other size is 0.
    pub fn with(cells: &[(S, u32)]) -> Self {
        let mut stock = Self::empty();
        for (size, count) in cells {
            stock.set(*size, *count);
        }
        stock
    }

    pub fn get(&self, size: S) -> u32 {
        self.counts.get(&size).copied().unwrap_or(0)
    }

    pub fn set(&mut self, size: S, count: u32) {
        self.counts.insert(size, count);
    }

    pub fn iter(&self) -> impl Iterator<Item = (S, u32)> + '_ {
        self.counts.iter().map(|(size, count)| (*size, *count))
    }

    pub fn total(&self) -> u64 {
        self.counts.values().map(|count| u64::from(*count)).sum()
    }
}

impl<S: SizeBand> Default for SizeStock<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: SizeBand> Serialize for SizeStock<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (size, count) in self.iter() {
            map.serialize_entry(size.label(), &count)?;
        }
        map.end()
    }
}

struct SizeStockVisitor<S>(PhantomData<S>);

impl<'de, S: SizeBand> Visitor<'de> for SizeStockVisitor<S> {
    type Value = SizeStock<S>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of size label to stock count")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut stock = SizeStock::empty();
        while let Some((label, count)) = access.next_entry::<String, i64>()? {
            let size = S::parse(&label).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown size label: {label}"))
            })?;
            stock.set(size, clamp_count(count));
        }
        Ok(stock)
    }
}

impl<'de, S: SizeBand> Deserialize<'de> for SizeStock<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SizeStockVisitor(PhantomData))
    }
}

/// Clamps a signed count into the non-negative stock range.
pub fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// The four-slot inventory of a design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub men: SizeStock<AdultSize>,
    #[serde(default)]
    pub women: SizeStock<AdultSize>,
    #[serde(default)]
    pub boys: SizeStock<KidsSize>,
    #[serde(default)]
    pub girls: SizeStock<KidsSize>,
}

impl Inventory {
    /// Current count of a cell, or `None` if `size` is not stocked in `category`.
    pub fn get(&self, category: Category, size: Size) -> Option<u32> {
        match (category, size) {
            (Category::Men, Size::Adult(size)) => Some(self.men.get(size)),
            (Category::Women, Size::Adult(size)) => Some(self.women.get(size)),
            (Category::Boys, Size::Kids(size)) => Some(self.boys.get(size)),
            (Category::Girls, Size::Kids(size)) => Some(self.girls.get(size)),
            _ => None,
        }
    }

    /// Writes a cell. Returns `false` without writing if `size` is not stocked
    /// in `category`.
    pub fn set(&mut self, category: Category, size: Size, count: u32) -> bool {
        match (category, size) {
            (Category::Men, Size::Adult(size)) => self.men.set(size, count),
            (Category::Women, Size::Adult(size)) => self.women.set(size, count),
            (Category::Boys, Size::Kids(size)) => self.boys.set(size, count),
            (Category::Girls, Size::Kids(size)) => self.girls.set(size, count),
            _ => return false,
        }
        true
    }

    /// Every `(category, size, count)` cell.
    pub fn cells(&self) -> Vec<(Category, Size, u32)> {
        let adult = |category: Category, stock: &SizeStock<AdultSize>| {
            stock
                .iter()
                .map(move |(size, count)| (category, Size::Adult(size), count))
                .collect::<Vec<_>>()
        };
        let kids = |category: Category, stock: &SizeStock<KidsSize>| {
            stock
                .iter()
                .map(move |(size, count)| (category, Size::Kids(size), count))
                .collect::<Vec<_>>()
        };

        let mut cells = adult(Category::Men, &self.men);
        cells.extend(adult(Category::Women, &self.women));
        cells.extend(kids(Category::Boys, &self.boys));
        cells.extend(kids(Category::Girls, &self.girls));
        cells
    }

    pub fn category_total(&self, category: Category) -> u64 {
        match category {
            Category::Men => self.men.total(),
            Category::Women => self.women.total(),
            Category::Boys => self.boys.total(),
            Category::Girls => self.girls.total(),
        }
    }
}

/// Which children's line a design is cut for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildType {
    Boys,
    Girls,
    Unisex,
    None,
}

/// A catalog design and its stock.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    pub id: String,
    pub name: String,
    pub color: String,
    pub fabric: String,
    pub image_url: String,
    pub label: Option<String>,
    pub child_type: Option<ChildType>,
    pub inventory: Inventory,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Staff input for a new design.
#[derive(Debug, Clone, Default)]
pub struct DesignDraft {
    pub name: String,
    pub color: String,
    pub fabric: String,
    pub image_url: String,
    pub label: Option<String>,
    pub child_type: Option<ChildType>,
    pub inventory: Inventory,
}

/// Staff edit of an existing design. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DesignPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub fabric: Option<String>,
    pub image_url: Option<String>,
    pub label: Option<Option<String>>,
    pub child_type: Option<Option<ChildType>>,
    pub inventory: Option<Inventory>,
}

impl Design {
    pub fn from_draft(id: impl Into<String>, draft: DesignDraft, created_at: i64) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            color: draft.color,
            fabric: draft.fabric,
            image_url: draft.image_url,
            label: draft.label,
            child_type: draft.child_type,
            inventory: draft.inventory,
            created_at,
        }
    }

    /// Applies a patch; `id` and `created_at` are never touched.
    pub fn apply_patch(&mut self, patch: DesignPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(fabric) = patch.fabric {
            self.fabric = fabric;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(child_type) = patch.child_type {
            self.child_type = child_type;
        }
        if let Some(inventory) = patch.inventory {
            self.inventory = inventory;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sizes_read_as_zero_and_negatives_clamp() {
        let stock: SizeStock<AdultSize> = serde_json::from_str(r#"{"XL": 4, "M": -2}"#).unwrap();
        assert_eq!(stock.get(AdultSize::Xl), 4);
        assert_eq!(stock.get(AdultSize::M), 0);
        assert_eq!(stock.get(AdultSize::ThreeXl), 0);
        assert_eq!(stock.iter().count(), AdultSize::ALL.len());
    }

    #[test]
    fn unknown_size_label_is_rejected() {
        let result = serde_json::from_str::<SizeStock<KidsSize>>(r#"{"8-9": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn inventory_serializes_every_cell() {
        let json = serde_json::to_value(Inventory::default()).unwrap();
        assert_eq!(json["men"].as_object().unwrap().len(), 5);
        assert_eq!(json["girls"].as_object().unwrap().len(), 11);
        assert_eq!(json["boys"]["13-14"], 0);
    }

    #[test]
    fn cross_category_cells_do_not_exist() {
        let mut inventory = Inventory::default();
        assert_eq!(inventory.get(Category::Men, Size::Kids(KidsSize::Age4To5)), None);
        assert!(!inventory.set(Category::Girls, Size::Adult(AdultSize::L), 3));
        assert!(inventory.set(Category::Girls, Size::Kids(KidsSize::Age2To3), 3));
        assert_eq!(inventory.category_total(Category::Girls), 3);
    }

    #[test]
    fn patch_keeps_identity() {
        let mut design = Design::from_draft("d1", DesignDraft::default(), 42);
        design.apply_patch(DesignPatch {
            name: Some("Indigo Block".into()),
            label: Some(None),
            ..Default::default()
        });
        assert_eq!(design.id, "d1");
        assert_eq!(design.created_at, 42);
        assert_eq!(design.name, "Indigo Block");
    }
}
