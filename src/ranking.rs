//! Usage ranking: accounts, categories, currencies and tags ordered by how much and how recently
//! they were used.
//!
//! Every key carries a score that gains one per use and decays by a constant factor with every
//! operation replayed after it, so recent use outweighs old use.

use crate::error::Result;
use crate::store::Store;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Score lost per operation.
pub const DECAY: f64 = 0.95;

/// An exponentially decayed hit counter. Scores are decayed lazily when read or hit.
#[derive(Debug, Clone)]
pub struct DecayCounter<K> {
    decay: f64,
    step: u64,
    scores: HashMap<K, (f64, u64)>,
}

impl<K> DecayCounter<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub fn new(decay: f64) -> Self {
        Self {
            decay,
            step: 0,
            scores: HashMap::new(),
        }
    }

    /// Moves time forward by one step.
    pub fn tick(&mut self) {
        self.step += 1;
    }

    pub fn hit(&mut self, key: K) {
        let (step, decay) = (self.step, self.decay);
        let (score, at) = self.scores.entry(key).or_insert((0.0, step));
        *score = *score * decay.powf((step - *at) as f64) + 1.0;
        *at = step;
    }

    /// The current score of `key`, zero if it was never hit.
    pub fn score(&self, key: &K) -> f64 {
        self.scores
            .get(key)
            .map(|(score, at)| score * self.decay.powf((self.step - at) as f64))
            .unwrap_or(0.0)
    }

    /// Every key ever hit, best first. Equal scores are ordered by key.
    pub fn ranked(&self) -> Vec<K> {
        let mut keys: Vec<(f64, &K)> = self
            .scores
            .keys()
            .map(|key| (self.score(key), key))
            .collect();
        keys.sort_by(|(a, ka), (b, kb)| b.total_cmp(a).then_with(|| ka.cmp(kb)));
        keys.into_iter().map(|(_, key)| key.clone()).collect()
    }
}

impl<K> Default for DecayCounter<K>
where
    K: Eq + Hash + Ord + Clone,
{
    fn default() -> Self {
        Self::new(DECAY)
    }
}

/// Ids (or values, for currencies and tags) ordered from most to least used.
#[derive(Debug, Clone, Default, Eq, PartialEq, serde::Serialize)]
pub struct UsageRanking {
    pub accounts: Vec<String>,
    pub categories: Vec<String>,
    pub currencies: Vec<String>,
    pub tags: Vec<String>,
}

impl UsageRanking {
    /// Replays the live operations of `store` once in canonical order.
    ///
    /// Deleted accounts and categories are left out. Live ones that were never used follow the
    /// used ones, ordered by name; the same goes for currencies of accounts that no operation
    /// was recorded in.
    pub fn build(store: &Store) -> Result<Self> {
        let mut accounts = DecayCounter::default();
        let mut categories = DecayCounter::default();
        let mut currencies = DecayCounter::default();
        let mut tags = DecayCounter::default();

        for op in store.live_operations()? {
            let Some(entry) = op.entry() else {
                continue;
            };
            accounts.hit(entry.account.id.clone());
            if let Some(to) = op.to_account() {
                if to.id != entry.account.id {
                    accounts.hit(to.id.clone());
                }
            }
            for category in op.categories().unwrap_or_default() {
                if !category.id.is_empty() {
                    categories.hit(category.id.clone());
                }
            }
            currencies.hit(entry.currency.clone());
            for tag in entry.tags.iter().collect::<HashSet<_>>() {
                tags.hit(tag.clone());
            }
            for counter in [&mut accounts, &mut categories, &mut currencies, &mut tags] {
                counter.tick();
            }
        }

        let mut live_accounts: Vec<_> = store.accounts()?.filter(|a| !a.deleted).collect();
        live_accounts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        let mut live_categories: Vec<_> = store.categories()?.filter(|c| !c.deleted).collect();
        live_categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let mut account_currencies: Vec<_> =
            live_accounts.iter().map(|a| a.currency.clone()).collect();
        account_currencies.sort();

        Ok(Self {
            accounts: complete(
                accounts.ranked(),
                live_accounts.iter().map(|a| a.id.clone()),
                true,
            ),
            categories: complete(
                categories.ranked(),
                live_categories.iter().map(|c| c.id.clone()),
                true,
            ),
            currencies: complete(currencies.ranked(), account_currencies, false),
            tags: tags.ranked(),
        })
    }
}

/// Appends the `known` keys missing from `ranked`. With `known_only`, drops ranked keys that are
/// not known.
fn complete(
    ranked: Vec<String>,
    known: impl IntoIterator<Item = String>,
    known_only: bool,
) -> Vec<String> {
    let known: Vec<String> = known.into_iter().collect();
    let mut out: Vec<String> = ranked
        .into_iter()
        .filter(|key| !known_only || known.contains(key))
        .collect();
    for key in known {
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}
