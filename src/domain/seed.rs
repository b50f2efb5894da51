//! Built-in catalog used when no designs have been persisted yet.

use super::design::{Design, Inventory, SizeStock};
use super::sizes::{AdultSize, KidsSize};

/// Creation time stamped on seed designs (2026-01-01T00:00:00Z).
pub const SEED_CREATED_AT: i64 = 1_767_225_600_000;

pub fn seed_catalog() -> Vec<Design> {
    vec![Design {
        id: "1".to_string(),
        name: "Garden Leaf Print".to_string(),
        color: "White / Green".to_string(),
        fabric: "Organza".to_string(),
        image_url: "https://images.unsplash.com/photo-1594938298603-c8148c4dae35?auto=format&fit=crop&q=80&w=400"
            .to_string(),
        label: Some("PREMIUM DESIGN".to_string()),
        child_type: None,
        inventory: Inventory {
            men: SizeStock::with(&[(AdultSize::Xxl, 9), (AdultSize::ThreeXl, 3)]),
            women: SizeStock::empty(),
            boys: SizeStock::with(&[
                (KidsSize::Age0To1, 20),
                (KidsSize::Age1To2, 3),
                (KidsSize::Age4To5, 2),
                (KidsSize::Age5To6, 6),
                (KidsSize::Age6To7, 3),
                (KidsSize::Age7To8, 1),
                (KidsSize::Age9To10, 3),
                (KidsSize::Age13To14, 3),
            ]),
            girls: SizeStock::with(&[
                (KidsSize::Age0To1, 2),
                (KidsSize::Age2To3, 5),
                (KidsSize::Age3To4, 6),
                (KidsSize::Age5To6, 4),
                (KidsSize::Age6To7, 2),
                (KidsSize::Age9To10, 3),
                (KidsSize::Age11To12, 2),
            ]),
        },
        created_at: SEED_CREATED_AT,
    }]
}
