use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::party::PartyKind;
use crate::errors::{BillingError, Result};

/// Currency precision applied when a store derives `amount` from quantity and rate.
pub const AMOUNT_DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Evening,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MilkType {
    Cow,
    Buffalo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    #[default]
    Milk,
    Paneer,
    Dahi,
    Ghee,
    Cream,
    Other,
}

/// Milk delivered by a farmer for one shift of one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionDetail {
    pub shift: Shift,
    pub milk_type: MilkType,
    pub quantity: Decimal,
    pub fat: Decimal,
    pub snf: Decimal,
    pub rate: Decimal,
}

/// A product sold to a customer or bulk buyer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleDetail {
    pub product: Product,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub rate: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_amount: Option<Decimal>,
}

/// Kind-specific fields of a ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryDetail {
    Collection(CollectionDetail),
    Sale(SaleDetail),
}

impl EntryDetail {
    /// The party kind this detail can be recorded against.
    pub fn party_kind(&self) -> PartyKind {
        match self {
            EntryDetail::Collection(_) => PartyKind::Farmer,
            EntryDetail::Sale(_) => PartyKind::Customer,
        }
    }

    pub fn quantity(&self) -> Decimal {
        match self {
            EntryDetail::Collection(detail) => detail.quantity,
            EntryDetail::Sale(detail) => detail.quantity,
        }
    }

    pub fn rate(&self) -> Decimal {
        match self {
            EntryDetail::Collection(detail) => detail.rate,
            EntryDetail::Sale(detail) => detail.rate,
        }
    }

    pub fn shift(&self) -> Option<Shift> {
        match self {
            EntryDetail::Collection(detail) => Some(detail.shift),
            EntryDetail::Sale(_) => None,
        }
    }

    /// Amount a store derives for this detail: the direct amount of a sale when present,
    /// otherwise quantity times rate rounded to currency precision. `None` when the product
    /// does not fit in a `Decimal`.
    pub fn computed_amount(&self) -> Option<Decimal> {
        match self {
            EntryDetail::Sale(SaleDetail {
                direct_amount: Some(amount),
                ..
            }) => Some(*amount),
            other => other
                .quantity()
                .checked_mul(other.rate())
                .map(|amount| amount.round_dp(AMOUNT_DECIMAL_PLACES)),
        }
    }

    fn checked_amount(&self) -> Result<Decimal> {
        self.computed_amount()
            .ok_or_else(|| BillingError::Rejected("amount out of range".into()))
    }

    /// Names the first negative figure, if any.
    pub fn negative_field(&self) -> Option<&'static str> {
        let checks: Vec<(&'static str, Decimal)> = match self {
            EntryDetail::Collection(detail) => vec![
                ("quantity", detail.quantity),
                ("rate", detail.rate),
                ("fat", detail.fat),
                ("snf", detail.snf),
            ],
            EntryDetail::Sale(detail) => vec![
                ("quantity", detail.quantity),
                ("rate", detail.rate),
                ("direct_amount", detail.direct_amount.unwrap_or_default()),
            ],
        };
        checks
            .into_iter()
            .find(|(_, value)| value.is_sign_negative() && !value.is_zero())
            .map(|(name, _)| name)
    }
}

/// Fields submitted to the ledger store when creating an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewEntry {
    pub date: NaiveDate,
    pub detail: EntryDetail,
}

impl NewEntry {
    pub fn new(date: NaiveDate, detail: EntryDetail) -> Self {
        Self { date, detail }
    }
}

/// One collection or sale record as returned by the ledger store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub detail: EntryDetail,
}

impl LedgerEntry {
    /// Materializes a submitted entry the way a store does: fresh id, derived amount.
    /// Fails with `Rejected` when the amount overflows.
    pub fn from_new(party_id: Uuid, fields: NewEntry) -> Result<Self> {
        let amount = fields.detail.checked_amount()?;
        Ok(Self {
            id: Uuid::new_v4(),
            party_id,
            date: fields.date,
            amount,
            detail: fields.detail,
        })
    }

    pub fn quantity(&self) -> Decimal {
        self.detail.quantity()
    }

    pub fn party_kind(&self) -> PartyKind {
        self.detail.party_kind()
    }
}

/// Partial update for an existing entry. Fields that do not apply to the entry's kind are
/// ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snf: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<Shift>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milk_type: Option<MilkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    /// `Some(None)` clears a sale's direct amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_amount: Option<Option<Decimal>>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        *self == EntryPatch::default()
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_direct_amount(mut self, amount: Option<Decimal>) -> Self {
        self.direct_amount = Some(amount);
        self
    }

    /// Returns a copy of `entry` with the patch applied and its amount recomputed.
    pub fn applied_to(&self, entry: &LedgerEntry) -> Result<LedgerEntry> {
        let mut updated = entry.clone();
        if let Some(date) = self.date {
            updated.date = date;
        }
        match &mut updated.detail {
            EntryDetail::Collection(detail) => {
                if let Some(quantity) = self.quantity {
                    detail.quantity = quantity;
                }
                if let Some(rate) = self.rate {
                    detail.rate = rate;
                }
                if let Some(fat) = self.fat {
                    detail.fat = fat;
                }
                if let Some(snf) = self.snf {
                    detail.snf = snf;
                }
                if let Some(shift) = self.shift {
                    detail.shift = shift;
                }
                if let Some(milk_type) = self.milk_type {
                    detail.milk_type = milk_type;
                }
            }
            EntryDetail::Sale(detail) => {
                if let Some(quantity) = self.quantity {
                    detail.quantity = quantity;
                }
                if let Some(rate) = self.rate {
                    detail.rate = rate;
                }
                if let Some(product) = self.product {
                    detail.product = product;
                }
                if let Some(direct_amount) = self.direct_amount {
                    detail.direct_amount = direct_amount;
                }
            }
        }
        updated.amount = updated.detail.checked_amount()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn collection(quantity: Decimal, rate: Decimal) -> EntryDetail {
        EntryDetail::Collection(CollectionDetail {
            shift: Shift::Morning,
            milk_type: MilkType::Cow,
            quantity,
            fat: dec!(4.2),
            snf: dec!(8.5),
            rate,
        })
    }

    fn sale(quantity: Decimal, rate: Decimal, direct_amount: Option<Decimal>) -> EntryDetail {
        EntryDetail::Sale(SaleDetail {
            product: Product::Milk,
            quantity,
            rate,
            direct_amount,
        })
    }

    #[test]
    fn collection_amount_rounds_to_paise() {
        let detail = collection(dec!(12.35), dec!(41.333));
        assert_eq!(detail.computed_amount(), Some(dec!(510.46)));
    }

    #[test]
    fn sale_direct_amount_overrides_quantity_times_rate() {
        let direct = sale(dec!(2), dec!(60), Some(dec!(100)));
        assert_eq!(direct.computed_amount(), Some(dec!(100)));
        assert_eq!(sale(dec!(2), dec!(60), None).computed_amount(), Some(dec!(120)));
        let only_direct = sale(dec!(0), dec!(0), Some(dec!(75.5)));
        assert_eq!(only_direct.computed_amount(), Some(dec!(75.5)));
    }

    #[test]
    fn overflowing_amount_is_rejected() {
        let huge = collection(Decimal::MAX, dec!(2));
        assert_eq!(huge.computed_amount(), None);
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let err = LedgerEntry::from_new(Uuid::new_v4(), NewEntry::new(date, huge)).unwrap_err();
        assert_eq!(err, BillingError::Rejected("amount out of range".into()));
    }

    #[test]
    fn negative_field_reports_first_offender() {
        assert_eq!(collection(dec!(-1), dec!(40)).negative_field(), Some("quantity"));
        let refund = sale(dec!(1), dec!(40), Some(dec!(-5)));
        assert_eq!(refund.negative_field(), Some("direct_amount"));
        assert_eq!(collection(dec!(0), dec!(0)).negative_field(), None);
    }

    #[test]
    fn patch_recomputes_amount_and_ignores_foreign_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let fields = NewEntry::new(date, sale(dec!(2), dec!(50), None));
        let entry = LedgerEntry::from_new(Uuid::new_v4(), fields).unwrap();
        assert_eq!(entry.amount, dec!(100));

        let patch = EntryPatch {
            quantity: Some(dec!(3)),
            fat: Some(dec!(6.0)),
            ..EntryPatch::default()
        };
        let updated = patch.applied_to(&entry).unwrap();
        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.amount, dec!(150));
        assert_eq!(updated.detail, sale(dec!(3), dec!(50), None));
    }

    #[test]
    fn patch_can_clear_direct_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let entry = LedgerEntry::from_new(
            Uuid::new_v4(),
            NewEntry::new(date, sale(dec!(1), dec!(45), Some(dec!(80)))),
        )
        .unwrap();
        let updated = EntryPatch::default()
            .with_direct_amount(None)
            .applied_to(&entry)
            .unwrap();
        assert_eq!(updated.amount, dec!(45));
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(EntryPatch::default().is_empty());
        assert!(!EntryPatch::default().with_rate(dec!(1)).is_empty());
    }
}
