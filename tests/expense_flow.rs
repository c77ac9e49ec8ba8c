use expense_model::{
    CategoryFilter, CurrencyFormat, ExpenseCategory, ExpenseDraft, ExpenseStore, FileStorage,
    Severity, SortOrder, Storage, DEFAULT_KEY,
};
use rust_decimal_macros::dec;
use std::{cell::Cell, fs, rc::Rc};
use tempfile::TempDir;

fn draft(name: &str, category: ExpenseCategory, amount: rust_decimal::Decimal) -> ExpenseDraft {
    let mut draft = ExpenseDraft::default();
    draft
        .with_name(name)
        .with_category(category)
        .with_amount(amount);
    draft
}

#[test]
fn add_project_and_reload_from_disk() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();

    let mut store = ExpenseStore::new(FileStorage::new(dir.path()));
    let changes = Rc::new(Cell::new(0));
    let counter = changes.clone();
    store.subscribe(move |_| counter.set(counter.get() + 1));

    let coffee = draft("Coffee", ExpenseCategory::Personal, dec!(4.50));
    let laptop = draft("Laptop", ExpenseCategory::Business, dec!(1499.00));
    assert!(coffee.can_save() && laptop.can_save());
    assert!(store.add(coffee.build().unwrap()));
    assert!(store.add(laptop.build().unwrap()));
    assert_eq!(changes.get(), 2);

    {
        let projection = store.project(&SortOrder::by_amount(), CategoryFilter::All);
        let personal = projection.section(ExpenseCategory::Personal).unwrap();
        let business = projection.section(ExpenseCategory::Business).unwrap();

        assert_eq!(personal.rows()[0].expense.name(), "Coffee");
        assert_eq!(personal.rows()[0].severity, Severity::Low);
        assert_eq!(business.rows()[0].expense.name(), "Laptop");
        assert_eq!(business.rows()[0].severity, Severity::High);

        let usd = CurrencyFormat::for_locale("en-US");
        assert_eq!(usd.format(business.rows()[0].expense.amount()), "$1,499.00");
    }

    let filtered = store.project(
        &SortOrder::by_amount(),
        "Business".parse::<CategoryFilter>().unwrap(),
    );
    assert!(filtered.section(ExpenseCategory::Personal).is_none());
    assert_eq!(filtered.sections().len(), 1);

    let expected = store.expenses().to_vec();
    let reloaded = ExpenseStore::new(FileStorage::new(dir.path()));
    assert_eq!(reloaded.expenses(), &expected[..]);
}

#[test]
fn delete_from_filtered_view_by_id() {
    let dir = TempDir::new().unwrap();
    let mut store = ExpenseStore::new(FileStorage::new(dir.path()));

    for (name, category, amount) in vec![
        ("Rent", ExpenseCategory::Personal, dec!(950)),
        ("Hosting", ExpenseCategory::Business, dec!(20)),
        ("Groceries", ExpenseCategory::Personal, dec!(85.40)),
    ] {
        store.add(draft(name, category, amount).build().unwrap());
    }

    // Position 0 of the filtered, name-sorted view is "Groceries", not "Rent"
    let ids = {
        let projection = store.project(
            &SortOrder::by_name(),
            CategoryFilter::Only(ExpenseCategory::Personal),
        );
        projection.sections()[0].ids_at(vec![0])
    };
    let removed = store.remove_ids(ids);

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].name(), "Groceries");

    let reloaded = ExpenseStore::new(FileStorage::new(dir.path()));
    let names: Vec<&str> = reloaded.expenses().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["Rent", "Hosting"]);
}

#[test]
fn corrupt_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    fs::write(storage.path_for(DEFAULT_KEY).unwrap(), "[{\"id\": 42").unwrap();

    let mut store = ExpenseStore::new(storage);
    assert!(store.is_empty());

    // The next mutation replaces the corrupt blob
    store.add(draft("Stamps", ExpenseCategory::Business, dec!(12)).build().unwrap());
    let bytes = store.storage().read(DEFAULT_KEY).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json[0]["name"], "Stamps");
    assert_eq!(json[0]["type"], "Business");
}
