use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::MilkType;

/// Which side of the business a party sits on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    /// Delivers milk to the dairy; billed from collections.
    Farmer,
    /// Buys products from the dairy; billed from sales.
    Customer,
}

impl PartyKind {
    pub fn label(&self) -> &'static str {
        match self {
            PartyKind::Farmer => "farmer",
            PartyKind::Customer => "customer",
        }
    }
}

impl std::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A farmer or customer as read from the ledger store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Party {
    pub id: Uuid,
    pub kind: PartyKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    /// Per-milk-type rate overrides; only meaningful for farmers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub milk_rates: BTreeMap<MilkType, Decimal>,
}

impl Party {
    pub fn farmer(name: impl Into<String>) -> Self {
        Self::new(PartyKind::Farmer, name)
    }

    pub fn customer(name: impl Into<String>) -> Self {
        Self::new(PartyKind::Customer, name)
    }

    pub fn new(kind: PartyKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            contact: None,
            milk_rates: BTreeMap::new(),
        }
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    /// Sets a rate override for the given milk type. Ignored for customers.
    pub fn with_milk_rate(mut self, milk_type: MilkType, rate: Decimal) -> Self {
        if self.kind == PartyKind::Farmer {
            self.milk_rates.insert(milk_type, rate);
        }
        self
    }

    pub fn milk_rate(&self, milk_type: MilkType) -> Option<Decimal> {
        self.milk_rates.get(&milk_type).copied()
    }

    pub fn is_farmer(&self) -> bool {
        self.kind == PartyKind::Farmer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rate_overrides_only_apply_to_farmers() {
        let farmer = Party::farmer("Ramesh").with_milk_rate(MilkType::Buffalo, dec!(52.5));
        let customer = Party::customer("Hotel Shree").with_milk_rate(MilkType::Cow, dec!(40));

        assert_eq!(farmer.milk_rate(MilkType::Buffalo), Some(dec!(52.5)));
        assert_eq!(farmer.milk_rate(MilkType::Cow), None);
        assert!(customer.milk_rates.is_empty());
    }

    #[test]
    fn party_kind_serializes_in_snake_case() {
        let json = serde_json::to_string(&PartyKind::Customer).unwrap();
        assert_eq!(json, "\"customer\"");
    }
}
