//! The canonical in-memory store of accounts, categories, operations and watches.
//!
//! The store is populated once with `init` and from then on only changes through the `push_*`
//! upserts and `clear_data`. Each mutation is published to subscribers as a `Change`, which is how
//! durable persistence (see `crate::persistence`) keeps up with it.

mod change;

pub use change::{Change, SubscriptionId};

use crate::error::{EntityKind, Error, Result};
use crate::model::{canonical_cmp, Account, Category, Entity, Operation, Snapshot, Watch};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

type Listener = Box<dyn Fn(&Change) + Send + Sync>;

#[derive(Default)]
struct Data {
    accounts: BTreeMap<String, Account>,
    categories: BTreeMap<String, Category>,
    watches: BTreeMap<String, Watch>,
    /// Always sorted by `canonical_cmp`.
    operations: Vec<Operation>,
    /// Operation id -> position in `operations`.
    operation_index: HashMap<String, usize>,
    accounts_by_name: HashMap<String, String>,
    categories_by_name: HashMap<String, String>,
    watches_by_name: HashMap<String, String>,
}

impl Data {
    fn new(snapshot: Snapshot) -> Self {
        let mut data = Data {
            accounts: snapshot
                .accounts
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect(),
            categories: snapshot
                .categories
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            watches: snapshot
                .watches
                .into_iter()
                .map(|w| (w.id.clone(), w))
                .collect(),
            ..Data::default()
        };
        // Later duplicates replace earlier ones, just like a sequence of pushes would.
        let mut by_id: HashMap<String, Operation> = HashMap::new();
        for op in snapshot.operations {
            by_id.insert(op.id().to_string(), op);
        }
        data.operations = by_id.into_values().collect();
        data.sort_operations();
        data.index_accounts();
        data.index_categories();
        data.index_watches();
        data
    }

    fn sort_operations(&mut self) {
        self.operations.sort_by(canonical_cmp);
        self.operation_index = self
            .operations
            .iter()
            .enumerate()
            .map(|(ix, op)| (op.id().to_string(), ix))
            .collect();
    }

    fn index_accounts(&mut self) {
        self.accounts_by_name = name_index(
            self.accounts
                .values()
                .map(|a| (a.name.as_str(), a.id.as_str(), a.deleted)),
        );
    }

    fn index_categories(&mut self) {
        self.categories_by_name = name_index(
            self.categories
                .values()
                .map(|c| (c.name.as_str(), c.id.as_str(), c.deleted)),
        );
    }

    fn index_watches(&mut self) {
        self.watches_by_name = name_index(
            self.watches
                .values()
                .map(|w| (w.name.as_str(), w.id.as_str(), w.deleted)),
        );
    }
}

/// Builds a name -> id index over `(name, id, deleted)` triples, skipping deleted entities.
fn name_index<'a>(items: impl Iterator<Item = (&'a str, &'a str, bool)>) -> HashMap<String, String> {
    items
        .filter(|(_, _, deleted)| !deleted)
        .map(|(name, id, _)| (name.to_string(), id.to_string()))
        .collect()
}

/// The operation store. See the module documentation.
#[derive(Default)]
pub struct Store {
    data: Option<Data>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("initialized", &self.data.is_some())
            .field("operations", &self.data.as_ref().map(|d| d.operations.len()))
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-replaces the contents of the store. Subscribers are not notified: the data is assumed
    /// to have come from the same durable storage they write to.
    ///
    /// Normally called once, right after loading. Calling it again discards everything held so
    /// far and installs `snapshot` in its place; subscriptions are kept.
    pub fn init(&mut self, snapshot: Snapshot) {
        let data = Data::new(snapshot);
        debug!(
            "Store initialized with {} accounts, {} categories, {} operations, {} watches",
            data.accounts.len(),
            data.categories.len(),
            data.operations.len(),
            data.watches.len()
        );
        self.data = Some(data);
    }

    pub fn is_initialized(&self) -> bool {
        self.data.is_some()
    }

    fn data(&self) -> Result<&Data> {
        self.data.as_ref().ok_or(Error::Uninitialized)
    }

    fn data_mut(&mut self) -> Result<&mut Data> {
        self.data.as_mut().ok_or(Error::Uninitialized)
    }

    /// Registers `listener` to be called synchronously after every mutation.
    pub fn subscribe(&mut self, listener: impl Fn(&Change) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        before != self.listeners.len()
    }

    fn notify(&self, change: Change) {
        trace!("Notifying {} listeners of {change:?}", self.listeners.len());
        for (_, listener) in &self.listeners {
            listener(&change);
        }
    }

    /// Inserts or replaces the operation with the same id and re-sorts the canonical sequence.
    pub fn push_operation(&mut self, op: Operation) -> Result<()> {
        let data = self.data_mut()?;
        match data.operation_index.get(op.id()) {
            Some(&ix) => data.operations[ix] = op.clone(),
            None => data.operations.push(op.clone()),
        }
        data.sort_operations();
        self.notify(Change::Put(Entity::Operation(op)));
        Ok(())
    }

    pub fn push_account(&mut self, account: Account) -> Result<()> {
        let data = self.data_mut()?;
        data.accounts.insert(account.id.clone(), account.clone());
        data.index_accounts();
        self.notify(Change::Put(Entity::Account(account)));
        Ok(())
    }

    pub fn push_category(&mut self, category: Category) -> Result<()> {
        let data = self.data_mut()?;
        data.categories.insert(category.id.clone(), category.clone());
        data.index_categories();
        self.notify(Change::Put(Entity::Category(category)));
        Ok(())
    }

    pub fn push_watch(&mut self, watch: Watch) -> Result<()> {
        let data = self.data_mut()?;
        data.watches.insert(watch.id.clone(), watch.clone());
        data.index_watches();
        self.notify(Change::Put(Entity::Watch(watch)));
        Ok(())
    }

    /// Upserts an entity of any kind.
    pub fn push(&mut self, entity: Entity) -> Result<()> {
        match entity {
            Entity::Account(a) => self.push_account(a),
            Entity::Category(c) => self.push_category(c),
            Entity::Operation(o) => self.push_operation(o),
            Entity::Watch(w) => self.push_watch(w),
        }
    }

    /// Removes everything. The store stays initialized, but empty.
    pub fn clear_data(&mut self) -> Result<()> {
        let data = self.data_mut()?;
        *data = Data::default();
        self.notify(Change::Cleared);
        Ok(())
    }

    /// All operations, tombstones included, in canonical order.
    pub fn operations(&self) -> Result<&[Operation]> {
        Ok(&self.data()?.operations)
    }

    /// Operations that are not deleted, in canonical order.
    pub fn live_operations(&self) -> Result<impl Iterator<Item = &Operation>> {
        Ok(self.operations()?.iter().filter(|op| !op.is_deleted()))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.data()?.operations.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn operation(&self, id: &str) -> Result<&Operation> {
        let data = self.data()?;
        data.operation_index
            .get(id)
            .map(|&ix| &data.operations[ix])
            .ok_or_else(|| Error::not_found(EntityKind::Operation, id))
    }

    /// The earliest non-deleted operation in canonical order.
    pub fn first_op(&self) -> Result<Option<&Operation>> {
        Ok(self.live_operations()?.next())
    }

    /// The latest non-deleted operation in canonical order.
    pub fn last_op(&self) -> Result<Option<&Operation>> {
        Ok(self
            .operations()?
            .iter()
            .rev()
            .find(|op| !op.is_deleted()))
    }

    pub fn accounts(&self) -> Result<impl Iterator<Item = &Account>> {
        Ok(self.data()?.accounts.values())
    }

    /// Accounts that are neither hidden nor deleted.
    pub fn visible_accounts(&self) -> Result<impl Iterator<Item = &Account>> {
        Ok(self.accounts()?.filter(|a| !a.hidden && !a.deleted))
    }

    pub fn account(&self, id: &str) -> Result<&Account> {
        self.data()?
            .accounts
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::Account, id))
    }

    /// Looks up a non-deleted account by name.
    pub fn account_by_name(&self, name: &str) -> Result<&Account> {
        let data = self.data()?;
        data.accounts_by_name
            .get(name)
            .and_then(|id| data.accounts.get(id))
            .ok_or_else(|| Error::not_found(EntityKind::Account, name))
    }

    pub fn categories(&self) -> Result<impl Iterator<Item = &Category>> {
        Ok(self.data()?.categories.values())
    }

    pub fn category(&self, id: &str) -> Result<&Category> {
        self.data()?
            .categories
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::Category, id))
    }

    /// Looks up a non-deleted category by name.
    pub fn category_by_name(&self, name: &str) -> Result<&Category> {
        let data = self.data()?;
        data.categories_by_name
            .get(name)
            .and_then(|id| data.categories.get(id))
            .ok_or_else(|| Error::not_found(EntityKind::Category, name))
    }

    pub fn watches(&self) -> Result<impl Iterator<Item = &Watch>> {
        Ok(self.data()?.watches.values())
    }

    pub fn watch(&self, id: &str) -> Result<&Watch> {
        self.data()?
            .watches
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::Watch, id))
    }

    /// Looks up a non-deleted watch by name.
    pub fn watch_by_name(&self, name: &str) -> Result<&Watch> {
        let data = self.data()?;
        data.watches_by_name
            .get(name)
            .and_then(|id| data.watches.get(id))
            .ok_or_else(|| Error::not_found(EntityKind::Watch, name))
    }

    /// Copies the full contents of the store, tombstones included.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let data = self.data()?;
        Ok(Snapshot {
            accounts: data.accounts.values().cloned().collect(),
            categories: data.categories.values().cloned().collect(),
            operations: data.operations.clone(),
            watches: data.watches.values().cloned().collect(),
        })
    }
}
