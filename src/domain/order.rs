use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::combo::{ComboType, Member};
use super::sizes::SizeChoice;

/// Country code used when a customer leaves it blank.
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

/// Order lifecycle state. Both non-pending states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer order against one design.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    /// May reference a design that has since been deleted.
    pub design_id: String,
    pub combo_type: ComboType,
    pub selected_sizes: BTreeMap<Member, SizeChoice>,
    pub customer_name: String,
    /// Opaque string; never parsed as a number.
    pub customer_phone: String,
    pub customer_country_code: String,
    pub customer_address: String,
    pub customer_email: Option<String>,
    pub notes: Option<BTreeMap<Member, String>>,
    pub status: OrderStatus,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Members with a real size selected, in member order.
    pub fn chosen_sizes(&self) -> impl Iterator<Item = (Member, SizeChoice)> + '_ {
        self.selected_sizes
            .iter()
            .filter(|(_, choice)| **choice != SizeChoice::NotApplicable)
            .map(|(member, choice)| (*member, *choice))
    }
}

/// Customer-facing order submission.
#[derive(Debug, Clone)]
pub struct OrderSubmission {
    pub design_id: String,
    pub combo_type: ComboType,
    pub selected_sizes: BTreeMap<Member, SizeChoice>,
    pub customer_name: String,
    pub customer_phone: String,
    /// Blank means [`DEFAULT_COUNTRY_CODE`].
    pub customer_country_code: String,
    pub customer_address: String,
    pub customer_email: Option<String>,
    pub notes: Option<BTreeMap<Member, String>>,
}

impl OrderSubmission {
    pub fn new(design_id: impl Into<String>, combo_type: ComboType) -> Self {
        Self {
            design_id: design_id.into(),
            combo_type,
            selected_sizes: BTreeMap::new(),
            customer_name: String::new(),
            customer_phone: String::new(),
            customer_country_code: String::new(),
            customer_address: String::new(),
            customer_email: None,
            notes: None,
        }
    }

    pub fn size(mut self, member: Member, choice: impl Into<SizeChoice>) -> Self {
        self.selected_sizes.insert(member, choice.into());
        self
    }

    pub fn customer(
        mut self,
        name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        self.customer_name = name.into();
        self.customer_phone = phone.into();
        self.customer_address = address.into();
        self
    }
}
