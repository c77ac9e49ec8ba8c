use crate::{
    expense::{Expense, ExpenseId},
    storage::{Storage, StorageError},
    view::{project, CategoryFilter, Projection, SortOrder},
};
use log::{debug, warn};
use std::collections::{BTreeSet, HashSet};

/// The key that expenses are persisted under unless a store is given its own
pub const DEFAULT_KEY: &str = "Items";

/// Describes a mutation that has just been applied to an `ExpenseStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Added(ExpenseId),
    Removed(Vec<ExpenseId>), // In store order
}

/// Returned by `ExpenseStore::subscribe`, used to unsubscribe again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&ChangeEvent)>;

/// The single owner of the expense list.
///
/// Every mutation rewrites the whole list to `Storage` before subscribers are notified.
/// Storage failures are never returned from a mutation: the in-memory list stays the
/// source of truth and `has_unsaved_changes` reports that the last write didn't land.
pub struct ExpenseStore<S: Storage> {
    storage: S,
    key: String,
    expenses: Vec<Expense>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    unsaved: bool,
}

impl<S: Storage> ExpenseStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_KEY)
    }

    pub fn with_key<K: Into<String>>(storage: S, key: K) -> Self {
        let key = key.into();
        let expenses = Self::load(&storage, &key);

        debug!("loaded {} expenses from '{}'", expenses.len(), key);

        ExpenseStore {
            storage,
            key,
            expenses,
            subscribers: Vec::new(),
            next_subscription: 0,
            unsaved: false,
        }
    }

    /// Read the expenses persisted under `key`.
    ///
    /// This never fails. A missing, unreadable or undecodable blob is treated as an empty
    /// list. Individual records that fail validation, or repeat an id already seen, are
    /// dropped and the rest are kept.
    pub fn load(storage: &S, key: &str) -> Vec<Expense> {
        let bytes = match storage.read(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("could not read expenses from '{}': {}", key, e);
                return Vec::new();
            }
        };

        // Decode record by record so that one bad entry can't take the others with it
        let records: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(e) => {
                warn!("discarding undecodable expenses in '{}': {}", key, e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        records
            .into_iter()
            .filter_map(|record| {
                let expense: Expense = match serde_json::from_value(record) {
                    Ok(expense) => expense,
                    Err(e) => {
                        warn!("dropping undecodable expense in '{}': {}", key, e);
                        return None;
                    }
                };

                match expense.validate() {
                    Ok(()) if seen.insert(expense.id()) => Some(expense),
                    Ok(()) => {
                        warn!("dropping expense with duplicate id {}", expense.id());
                        None
                    }
                    Err(e) => {
                        warn!("dropping invalid expense {}: {}", expense.id(), e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Expenses in insertion order
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }

    pub fn get(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id() == id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable access to the storage port, e.g. to repair it before retrying `save`
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Whether the most recent write to storage failed
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn project(&self, order: &SortOrder, filter: CategoryFilter) -> Projection<'_> {
        project(&self.expenses, order, filter)
    }

    /// Append an expense and persist.
    ///
    /// Returns `false`, leaving the store untouched, if the expense is invalid or its id
    /// is already in the store.
    pub fn add(&mut self, expense: Expense) -> bool {
        if let Err(e) = expense.validate() {
            warn!("refusing to add invalid expense {}: {}", expense.id(), e);
            return false;
        }

        if self.get(expense.id()).is_some() {
            warn!("refusing to add expense with duplicate id {}", expense.id());
            return false;
        }

        let id = expense.id();
        debug!(
            "adding {} expense '{}' ({}) for {}",
            expense.category(),
            expense.name(),
            id,
            expense.amount()
        );

        self.expenses.push(expense);
        self.persist();
        self.notify(ChangeEvent::Added(id));
        true
    }

    /// Remove the expenses at `positions` in *store* order and persist.
    ///
    /// Positions taken from a `Projection` do not line up with store order once it has
    /// been sorted or filtered; use `Section::ids_at` and `remove_ids` for those.
    /// Out-of-range positions are ignored. Returns the removed expenses in store order.
    pub fn remove_at<I>(&mut self, positions: I) -> Vec<Expense>
    where
        I: IntoIterator<Item = usize>,
    {
        let len = self.expenses.len();
        let positions: BTreeSet<usize> = positions.into_iter().filter(|&i| i < len).collect();

        if positions.is_empty() {
            return Vec::new();
        }

        // Remove from the back so that earlier positions stay valid
        let mut removed: Vec<Expense> = positions
            .iter()
            .rev()
            .map(|&i| self.expenses.remove(i))
            .collect();
        removed.reverse();

        let ids: Vec<ExpenseId> = removed.iter().map(Expense::id).collect();
        debug!("removed {} expenses: {:?}", ids.len(), ids);

        self.persist();
        self.notify(ChangeEvent::Removed(ids));
        removed
    }

    pub fn remove_by_id(&mut self, id: ExpenseId) -> Option<Expense> {
        let position = self.expenses.iter().position(|e| e.id() == id)?;
        self.remove_at(Some(position)).pop()
    }

    /// Remove every expense whose id is in `ids`. Unknown ids are ignored.
    pub fn remove_ids<I>(&mut self, ids: I) -> Vec<Expense>
    where
        I: IntoIterator<Item = ExpenseId>,
    {
        let ids: HashSet<ExpenseId> = ids.into_iter().collect();
        let positions: Vec<usize> = self
            .expenses
            .iter()
            .enumerate()
            .filter(|(_, e)| ids.contains(&e.id()))
            .map(|(i, _)| i)
            .collect();

        self.remove_at(positions)
    }

    /// Call `f` after every mutation until it is unsubscribed
    pub fn subscribe<F>(&mut self, f: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Write the full expense list to storage.
    ///
    /// Mutations already do this and swallow any failure. Call `save` directly to retry
    /// after `has_unsaved_changes` reports a failed write.
    pub fn save(&mut self) -> Result<(), StorageError> {
        let result = serde_json::to_vec(&self.expenses)
            .map_err(StorageError::Encode)
            .and_then(|bytes| self.storage.write(&self.key, &bytes));

        self.unsaved = result.is_err();
        result
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            warn!(
                "could not save {} expenses to '{}', keeping them in memory: {}",
                self.expenses.len(),
                self.key,
                e
            );
        }
    }

    fn notify(&mut self, event: ChangeEvent) {
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&event);
        }
    }
}
