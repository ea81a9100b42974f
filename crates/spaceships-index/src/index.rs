//! Uniform-grid spatial index over individually locked records.
//!
//! Lock order: a thread may hold the `entries` read lock while taking slot
//! read locks, and a record's `writer` mutex while doing anything else.
//! Slot write locks are only taken with no other index lock held.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use glam::DVec2;
use serde::Deserialize;

use spaceships_core::types::Aabb;

use crate::error::IndexError;
use crate::query::SpatialQuery;

/// Opaque handle to a record, valid until the record is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

/// How concurrent writers to the same record are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Run the transaction on a copy, commit only if nobody committed in between.
    Optimistic { retry_limit: u32 },
    /// Hold the record's writer lock for the whole transaction.
    Pessimistic,
}

/// Index tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndexConfig {
    pub optimistic: bool,
    pub optimistic_retry_limit: u32,
    /// Edge length of a grid cell.
    pub cell_size: f64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            optimistic: true,
            optimistic_retry_limit: 3,
            cell_size: 100.0,
        }
    }
}

impl IndexConfig {
    pub fn mode(&self) -> ConcurrencyMode {
        if self.optimistic {
            ConcurrencyMode::Optimistic {
                retry_limit: self.optimistic_retry_limit,
            }
        } else {
            ConcurrencyMode::Pessimistic
        }
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(IndexError::InvalidConfig("cell-size must be positive"));
        }
        if self.optimistic && self.optimistic_retry_limit == 0 {
            return Err(IndexError::InvalidConfig(
                "optimistic-retry-limit must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A record copied out of the index together with its token and bbox.
#[derive(Debug, Clone)]
pub struct Element<T> {
    pub token: Token,
    pub bounds: Aabb,
    pub record: T,
}

struct Slot<T> {
    bounds: Aabb,
    record: T,
    version: u64,
}

struct Entry<T> {
    slot: RwLock<Slot<T>>,
    writer: Mutex<()>,
}

type Cell = (i64, i64);

fn read<L>(lock: &RwLock<L>) -> RwLockReadGuard<'_, L> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<L>(lock: &RwLock<L>) -> RwLockWriteGuard<'_, L> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<L>(mutex: &Mutex<L>) -> MutexGuard<'_, L> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Concurrent container from bounding box to record.
///
/// Every record has exactly one owner that issues write transactions
/// against it; the owner is also the one that deletes it.
pub struct SpatialIndex<T> {
    cell_size: f64,
    mode: ConcurrencyMode,
    next_token: AtomicU64,
    entries: RwLock<HashMap<Token, Arc<Entry<T>>>>,
    grid: RwLock<HashMap<Cell, HashSet<Token>>>,
}

impl<T: Clone> SpatialIndex<T> {
    pub fn new(config: IndexConfig) -> Result<Self, IndexError> {
        config.validate()?;
        Ok(Self {
            cell_size: config.cell_size,
            mode: config.mode(),
            next_token: AtomicU64::new(1),
            entries: RwLock::new(HashMap::new()),
            grid: RwLock::new(HashMap::new()),
        })
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&self, record: T, bounds: Aabb) -> Token {
        self.insert_with(bounds, |_| record)
    }

    /// Insert a record that needs to know its own token.
    pub fn insert_with(&self, bounds: Aabb, make: impl FnOnce(Token) -> T) -> Token {
        let token = Token(self.next_token.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(Entry {
            slot: RwLock::new(Slot {
                bounds,
                record: make(token),
                version: 0,
            }),
            writer: Mutex::new(()),
        });
        write(&self.entries).insert(token, entry);
        self.bucket(token, &bounds);
        token
    }

    /// Remove a record. Returns false if the token was already gone.
    pub fn delete(&self, token: Token) -> bool {
        let Some(entry) = write(&self.entries).remove(&token) else {
            return false;
        };
        let bounds = read(&entry.slot).bounds;
        self.unbucket(token, &bounds);
        true
    }

    /// Current bbox and record behind a token, or `None` once it was deleted.
    pub fn read_element(&self, token: Token) -> Option<Element<T>> {
        let entry = self.entry(token)?;
        let slot = read(&entry.slot);
        Some(Element {
            token,
            bounds: slot.bounds,
            record: slot.record.clone(),
        })
    }

    /// Read-only copies of every record matching `query`, ordered by token.
    pub fn query<Q>(&self, query: &Q) -> Vec<Element<T>>
    where
        Q: SpatialQuery<T> + ?Sized,
    {
        let candidates = self.candidates(query);
        let entries = read(&self.entries);
        let mut found = Vec::new();
        for token in candidates {
            let Some(entry) = entries.get(&token) else {
                continue;
            };
            let slot = read(&entry.slot);
            if query.query_element(&slot.bounds, &slot.record) {
                found.push(Element {
                    token,
                    bounds: slot.bounds,
                    record: slot.record.clone(),
                });
            }
        }
        found
    }

    /// Self-update transaction.
    ///
    /// `f` receives the records matching `range` and a mutable copy of the
    /// caller's own record, and returns the record's new bbox. Under
    /// optimistic concurrency `f` may run more than once. Returns the
    /// committed record, or `None` if `token` no longer exists.
    pub fn query_for_update<Q, F>(
        &self,
        range: &Q,
        token: Token,
        mut f: F,
    ) -> Result<Option<T>, IndexError>
    where
        Q: SpatialQuery<T> + ?Sized,
        F: FnMut(&[Element<T>], &mut T) -> Aabb,
    {
        self.transact(token, |record| {
            let neighbors = self.query(range);
            f(&neighbors, record)
        })
    }

    /// Exclusive update of a single record, without reading neighbors.
    pub fn update<F>(&self, token: Token, f: F) -> Result<Option<T>, IndexError>
    where
        F: FnMut(&mut T) -> Aabb,
    {
        self.transact(token, f)
    }

    fn transact<F>(&self, token: Token, mut f: F) -> Result<Option<T>, IndexError>
    where
        F: FnMut(&mut T) -> Aabb,
    {
        let Some(entry) = self.entry(token) else {
            return Ok(None);
        };

        match self.mode {
            ConcurrencyMode::Pessimistic => {
                let _writer = lock(&entry.writer);
                let mut record = read(&entry.slot).record.clone();
                let bounds = f(&mut record);
                let old = {
                    let mut slot = write(&entry.slot);
                    let old = slot.bounds;
                    slot.record = record.clone();
                    slot.bounds = bounds;
                    slot.version += 1;
                    old
                };
                self.rebucket(token, &old, &bounds);
                Ok(Some(record))
            }
            ConcurrencyMode::Optimistic { retry_limit } => {
                for attempt in 1..=retry_limit {
                    let (mut record, version) = {
                        let slot = read(&entry.slot);
                        (slot.record.clone(), slot.version)
                    };
                    let bounds = f(&mut record);
                    let committed = {
                        let mut slot = write(&entry.slot);
                        if slot.version == version {
                            let old = slot.bounds;
                            slot.record = record.clone();
                            slot.bounds = bounds;
                            slot.version += 1;
                            Some(old)
                        } else {
                            None
                        }
                    };
                    if let Some(old) = committed {
                        self.rebucket(token, &old, &bounds);
                        return Ok(Some(record));
                    }
                    tracing::trace!(?token, attempt, "optimistic commit conflicted");
                }
                Err(IndexError::RetryLimitExceeded {
                    token,
                    attempts: retry_limit,
                })
            }
        }
    }

    fn entry(&self, token: Token) -> Option<Arc<Entry<T>>> {
        read(&self.entries).get(&token).cloned()
    }

    fn cell_of(&self, p: DVec2) -> Cell {
        // Float-to-int casts saturate, so unbounded regions map to the grid edges.
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    fn cell_bounds(&self, cell: Cell) -> Aabb {
        let min = DVec2::new(cell.0 as f64, cell.1 as f64) * self.cell_size;
        Aabb {
            min,
            max: min + DVec2::splat(self.cell_size),
        }
    }

    fn cells_covering(&self, bounds: &Aabb) -> (Cell, Cell) {
        (self.cell_of(bounds.min), self.cell_of(bounds.max))
    }

    fn bucket(&self, token: Token, bounds: &Aabb) {
        let (lo, hi) = self.cells_covering(bounds);
        let mut grid = write(&self.grid);
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                grid.entry((cx, cy)).or_default().insert(token);
            }
        }
    }

    fn unbucket(&self, token: Token, bounds: &Aabb) {
        let (lo, hi) = self.cells_covering(bounds);
        let mut grid = write(&self.grid);
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                if let Some(tokens) = grid.get_mut(&(cx, cy)) {
                    tokens.remove(&token);
                    if tokens.is_empty() {
                        grid.remove(&(cx, cy));
                    }
                }
            }
        }
    }

    fn rebucket(&self, token: Token, old: &Aabb, new: &Aabb) {
        if self.cells_covering(old) == self.cells_covering(new) {
            return;
        }
        self.unbucket(token, old);
        self.bucket(token, new);
    }

    /// Tokens in every occupied cell that the query does not prune.
    fn candidates<Q>(&self, query: &Q) -> Vec<Token>
    where
        Q: SpatialQuery<T> + ?Sized,
    {
        let (lo, hi) = self.cells_covering(&query.bounds());
        let grid = read(&self.grid);
        let span = (hi.0.saturating_sub(lo.0).saturating_add(1))
            .saturating_mul(hi.1.saturating_sub(lo.1).saturating_add(1));

        let mut seen = HashSet::new();
        let mut visit = |cell: Cell, tokens: &HashSet<Token>| {
            if query.query_container(&self.cell_bounds(cell)) {
                seen.extend(tokens.iter().copied());
            }
        };

        if span <= 0 {
            return Vec::new();
        }
        if span as u64 > grid.len() as u64 {
            for (&cell, tokens) in grid.iter() {
                if (lo.0..=hi.0).contains(&cell.0) && (lo.1..=hi.1).contains(&cell.1) {
                    visit(cell, tokens);
                }
            }
        } else {
            for cx in lo.0..=hi.0 {
                for cy in lo.1..=hi.1 {
                    if let Some(tokens) = grid.get(&(cx, cy)) {
                        visit((cx, cy), tokens);
                    }
                }
            }
        }

        let mut tokens: Vec<Token> = seen.into_iter().collect();
        tokens.sort_unstable();
        tokens
    }
}
