mod draft;
mod expense;
mod format;
mod storage;
mod store;
mod view;

pub use draft::{ExpenseDraft, StepMode, STEP_SIZES};
pub use expense::{Expense, ExpenseCategory, ExpenseError, ExpenseId, MAX_AMOUNT, PLACEHOLDER_NAME};
pub use format::CurrencyFormat;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::{ChangeEvent, ExpenseStore, SubscriptionId, DEFAULT_KEY};
pub use view::{
    classify, project, CategoryFilter, Projection, Row, Section, Severity, SortField, SortOrder,
};

// This represents the number of decimal places that a currency can validly express.
// @todo Support the full range of currency precisions specified in ISO 4217.
const CURRENCY_PRECISION: u32 = 2;
