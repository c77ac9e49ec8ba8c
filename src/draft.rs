use crate::expense::{validate_amount, validate_name, Expense, ExpenseCategory, ExpenseError, MAX_AMOUNT};
use log::trace;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The quick-step increments offered alongside the amount field
pub const STEP_SIZES: [Decimal; 3] = [dec!(1), dec!(10), dec!(100)];

/// Whether a quick-step increases or decreases the draft amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Add,
    Subtract,
}

/// The working state of the "add expense" form.
///
/// A draft can hold anything the user has typed so far. It only becomes an `Expense`
/// once `build` succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub name: String,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub step_mode: StepMode,
}

impl Default for StepMode {
    fn default() -> Self {
        StepMode::Add
    }
}

impl Default for ExpenseDraft {
    fn default() -> Self {
        ExpenseDraft {
            name: String::new(),
            category: ExpenseCategory::default(),
            amount: Decimal::ZERO,
            step_mode: StepMode::default(),
        }
    }
}

impl ExpenseDraft {
    pub fn with_name<S: Into<String>>(&mut self, name: S) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn with_category(&mut self, category: ExpenseCategory) -> &mut Self {
        self.category = category;
        self
    }

    pub fn with_amount(&mut self, amount: Decimal) -> &mut Self {
        self.amount = amount;
        self
    }

    pub fn with_step_mode(&mut self, mode: StepMode) -> &mut Self {
        self.step_mode = mode;
        self
    }

    /// Nudge the amount by `size` in the direction of the current `StepMode`.
    ///
    /// Subtracting never takes the amount below zero; a step larger than the current
    /// amount clears it instead. Adding stops at `MAX_AMOUNT`.
    pub fn step(&mut self, size: Decimal) -> &mut Self {
        let before = self.amount;

        self.amount = match self.step_mode {
            StepMode::Add => match self.amount.checked_add(size) {
                Some(sum) if sum <= MAX_AMOUNT => sum,
                Some(_) => self.amount.max(MAX_AMOUNT),
                None => self.amount,
            },
            StepMode::Subtract if self.amount >= size => self.amount - size,
            StepMode::Subtract => Decimal::ZERO,
        };

        trace!(
            "stepped draft amount {:?} by {}: {} => {}",
            self.step_mode,
            size,
            before,
            self.amount
        );
        self
    }

    /// Whether the confirm action should be enabled
    pub fn can_save(&self) -> bool {
        validate_name(&self.name).is_ok() && validate_amount(self.amount).is_ok()
    }

    pub fn build(&self) -> Result<Expense, ExpenseError> {
        Expense::new(self.name.clone(), self.category, self.amount)
    }
}
