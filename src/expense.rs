use crate::CURRENCY_PRECISION;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

/// The name the add form starts with. A record may never be saved under it.
pub const PLACEHOLDER_NAME: &str = "New Expense";

/// The largest amount a single expense may hold.
///
/// Amounts are persisted as JSON numbers, which decode through an `f64`. Keeping every
/// valid amount within 15 significant digits means it survives that round trip exactly.
pub const MAX_AMOUNT: Decimal = dec!(999999999999.99);

/// Uniquely identifies an `Expense` for the lifetime of the store that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(Uuid);

/// The kind of spending an `Expense` represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Personal,
    Business,
}

/// A single expense entry.
///
/// Expenses are created once and never edited. The only way to change what the store
/// holds is to add a new `Expense` or remove an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    id: ExpenseId,
    name: String,
    // Stored as "type" so that blobs written by earlier releases still decode
    #[serde(rename = "type")]
    category: ExpenseCategory,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ExpenseError {
    #[error("expense name cannot be empty")]
    EmptyName,
    #[error("expense name cannot be '{}'", PLACEHOLDER_NAME)]
    PlaceholderName,
    #[error("expense amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("expense amount cannot be more than {max}, got {0}", max = MAX_AMOUNT)]
    AmountTooLarge(Decimal),
    #[error("currency values cannot have more than 2 decimal places")]
    CurrencyPrecision,
    #[error("unknown expense category '{0}'")]
    UnknownCategory(String),
}

impl ExpenseId {
    pub fn new() -> Self {
        ExpenseId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ExpenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ExpenseCategory {
    /// Every category, in the order that sections are displayed
    pub const ALL: [ExpenseCategory; 2] = [ExpenseCategory::Personal, ExpenseCategory::Business];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Personal => "Personal",
            ExpenseCategory::Business => "Business",
        }
    }
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        ExpenseCategory::Personal
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ExpenseError::UnknownCategory(s.into()))
    }
}

impl Expense {
    pub fn new<S: Into<String>>(
        name: S,
        category: ExpenseCategory,
        amount: Decimal,
    ) -> Result<Self, ExpenseError> {
        let expense = Expense {
            id: ExpenseId::new(),
            name: name.into(),
            category,
            amount,
        };
        expense.validate()?;
        Ok(expense)
    }

    /// Checks the rules that every stored expense must satisfy.
    ///
    /// `Expense::new` already enforces these, but records that arrive through
    /// deserialization have not been through the constructor.
    pub fn validate(&self) -> Result<(), ExpenseError> {
        validate_name(&self.name)?;
        validate_amount(self.amount)
    }

    pub fn id(&self) -> ExpenseId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ExpenseCategory {
        self.category
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), ExpenseError> {
    if name.trim().is_empty() {
        return Err(ExpenseError::EmptyName);
    }

    if name == PLACEHOLDER_NAME {
        return Err(ExpenseError::PlaceholderName);
    }

    Ok(())
}

pub(crate) fn validate_amount(amount: Decimal) -> Result<(), ExpenseError> {
    if amount <= Decimal::ZERO {
        return Err(ExpenseError::NonPositiveAmount(amount));
    }

    if amount > MAX_AMOUNT {
        return Err(ExpenseError::AmountTooLarge(amount));
    }

    // Trailing zeros don't count, so 4.500 is still a valid amount
    if amount.normalize().scale() > CURRENCY_PRECISION {
        return Err(ExpenseError::CurrencyPrecision);
    }

    Ok(())
}
