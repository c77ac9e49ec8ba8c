use crate::expense::{Expense, ExpenseCategory, ExpenseError, ExpenseId};
use log::trace;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{cmp::Ordering, fmt, str::FromStr};

// Amounts up to and including these bounds fall into the lower bucket
const LOW_SEVERITY_MAX: Decimal = dec!(100);
const MEDIUM_SEVERITY_MAX: Decimal = dec!(1000);

const FILTER_ALL: &str = "All";

/// A field that expenses can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Amount,
}

/// An ordered list of sort keys. Later keys only break ties left by earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder(Vec<SortField>);

/// Restricts a projection to a single category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(ExpenseCategory),
}

/// How much visual emphasis an amount deserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A single expense as it should be displayed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row<'a> {
    pub expense: &'a Expense,
    pub severity: Severity,
}

/// The displayed expenses that belong to one category
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    category: ExpenseCategory,
    rows: Vec<Row<'a>>,
}

/// The filtered, sorted and grouped view of a store's expenses.
///
/// A `Projection` borrows the expenses it was built from, so it can't outlive the next
/// mutation of the store. Rebuild it whenever the store reports a change.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection<'a> {
    sections: Vec<Section<'a>>,
}

/// Bucket an amount by size. Boundary values belong to the lower bucket.
pub fn classify(amount: Decimal) -> Severity {
    if amount <= LOW_SEVERITY_MAX {
        Severity::Low
    } else if amount <= MEDIUM_SEVERITY_MAX {
        Severity::Medium
    } else {
        Severity::High
    }
}

/// Filter, then sort, then group `expenses` into sections.
///
/// Sections always appear in `ExpenseCategory::ALL` order and only if they have at least
/// one row.
pub fn project<'a>(
    expenses: &'a [Expense],
    order: &SortOrder,
    filter: CategoryFilter,
) -> Projection<'a> {
    let mut visible: Vec<&Expense> = expenses.iter().filter(|e| filter.matches(e)).collect();

    // `sort_by` is stable, so fully equal keys keep their insertion order
    visible.sort_by(|a, b| order.compare(a, b));

    trace!(
        "projected {} of {} expenses with filter {} and order {:?}",
        visible.len(),
        expenses.len(),
        filter,
        order
    );

    let sections = ExpenseCategory::ALL
        .iter()
        .filter_map(|&category| {
            let rows: Vec<Row> = visible
                .iter()
                .filter(|e| e.category() == category)
                .map(|&expense| Row {
                    expense,
                    severity: classify(expense.amount()),
                })
                .collect();

            if rows.is_empty() {
                None
            } else {
                Some(Section { category, rows })
            }
        })
        .collect();

    Projection { sections }
}

impl SortOrder {
    pub fn new(fields: Vec<SortField>) -> Self {
        SortOrder(fields)
    }

    /// Cheapest first, then alphabetical
    pub fn by_amount() -> Self {
        SortOrder(vec![SortField::Amount, SortField::Name])
    }

    /// Alphabetical, then cheapest first
    pub fn by_name() -> Self {
        SortOrder(vec![SortField::Name, SortField::Amount])
    }

    pub fn fields(&self) -> &[SortField] {
        &self.0
    }

    pub fn compare(&self, a: &Expense, b: &Expense) -> Ordering {
        self.0.iter().fold(Ordering::Equal, |acc, field| {
            acc.then_with(|| match field {
                SortField::Name => a.name().cmp(b.name()),
                SortField::Amount => a.amount().cmp(&b.amount()),
            })
        })
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::by_name()
    }
}

impl CategoryFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => expense.category() == *category,
        }
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        CategoryFilter::All
    }
}

impl From<ExpenseCategory> for CategoryFilter {
    fn from(category: ExpenseCategory) -> Self {
        CategoryFilter::Only(category)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(FILTER_ALL),
            CategoryFilter::Only(category) => fmt::Display::fmt(category, f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == FILTER_ALL {
            return Ok(CategoryFilter::All);
        }

        s.parse().map(CategoryFilter::Only)
    }
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<'a> Section<'a> {
    pub fn category(&self) -> ExpenseCategory {
        self.category
    }

    pub fn rows(&self) -> &[Row<'a>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.rows.iter().map(|r| r.expense.amount()).sum()
    }

    /// Translate positions within this section into stable expense ids.
    ///
    /// Display positions only mean something inside the section they were taken from.
    /// Delete through the returned ids rather than through store positions. Positions
    /// past the end of the section are skipped.
    pub fn ids_at<I>(&self, offsets: I) -> Vec<ExpenseId>
    where
        I: IntoIterator<Item = usize>,
    {
        offsets
            .into_iter()
            .filter_map(|i| self.rows.get(i))
            .map(|r| r.expense.id())
            .collect()
    }
}

impl<'a> Projection<'a> {
    pub fn sections(&self) -> &[Section<'a>] {
        &self.sections
    }

    pub fn section(&self, category: ExpenseCategory) -> Option<&Section<'a>> {
        self.sections.iter().find(|s| s.category == category)
    }

    /// True when there is nothing to display, e.g. to show a "no expenses yet" prompt
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of rows across every section
    pub fn len(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }

    pub fn total(&self) -> Decimal {
        self.sections.iter().map(Section::total).sum()
    }
}
