//! Reactive value cells.
//!
//! A cell holds one [`Value`] and an ordered list of subscriptions. Writing a
//! structurally equal value is a no-op unless forced. Listeners run
//! synchronously in subscription order and may write other cells, so a single
//! external stimulus propagates depth-first through the whole circuit before
//! control returns to the caller.
//!
//! # Listener types
//!
//! - **Targets** ([`Target`]): engine-internal edges (a wire into an input
//!   cell, or a node that must recalculate). Delivered through a
//!   [`Dispatch`] implementation supplied by the caller of [`CellStore::set`].
//! - **Observers**: boxed closures that see the change and return further
//!   [`CellWrite`]s, applied immediately after the observer returns.
//!
//! # Re-entrancy
//!
//! While a cell is delivering notifications it is marked as notifying. A write
//! that reaches the same cell again is either stored without re-notifying
//! ([`ReentrancyPolicy::Settle`]) or rejected ([`ReentrancyPolicy::Reject`]).

use slotmap::SlotMap;

use crate::config::ReentrancyPolicy;
use crate::id::{CellId, InputRef, NodeId, SubscriptionId};
use crate::value::{Kind, Value};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CellError {
    #[error("cell not found: {0:?}")]
    UnknownCell(CellId),
    #[error("re-entrant write to cell {0:?} while it was notifying")]
    Reentrant(CellId),
    #[error("propagation exceeded the maximum depth of {limit}")]
    DepthExceeded { limit: u32 },
}

// ---------------------------------------------------------------------------
// Change records
// ---------------------------------------------------------------------------

/// Delivered to every listener of a cell whose value changed.
#[derive(Debug, Clone)]
pub struct CellChange {
    pub cell: CellId,
    pub previous: Value,
    pub current: Value,
}

/// A write requested by an observer.
#[derive(Debug, Clone)]
pub struct CellWrite {
    pub cell: CellId,
    pub value: Value,
    pub force: bool,
}

impl CellWrite {
    pub fn new(cell: CellId, value: Value) -> Self {
        Self {
            cell,
            value,
            force: false,
        }
    }
}

/// What a call to [`CellStore::set`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value was structurally equal and not forced; nobody was notified.
    Unchanged,
    /// The value was stored and every listener notified.
    Changed,
    /// The cell was already notifying; the value was stored without notifying.
    Settled,
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Engine-internal listener, delivered through [`Dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Forward the value across a wire into the consumer's input cell.
    Wire { input_cell: CellId, input: InputRef },
    /// Recalculate a node.
    Node(NodeId),
}

/// An observer sees the change and may request writes to other cells.
pub type Observer = Box<dyn FnMut(&CellChange) -> Vec<CellWrite>>;

enum Listener {
    Target(Target),
    /// `None` only while the closure is being invoked.
    Observer(Option<Observer>),
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Listener::Target(t) => write!(f, "Target({t:?})"),
            Listener::Observer(_) => write!(f, "Observer(<fn>)"),
        }
    }
}

#[derive(Debug)]
struct Subscription {
    cell: CellId,
    listener: Listener,
}

/// Routes [`Target`] notifications to the engine.
pub trait Dispatch {
    fn deliver(
        &mut self,
        cells: &mut CellStore,
        target: &Target,
        change: &CellChange,
    ) -> Result<(), CellError>;
}

/// A dispatcher with no nodes attached: wires forward verbatim and node
/// targets are ignored.
#[derive(Debug, Default)]
pub struct Detached;

impl Dispatch for Detached {
    fn deliver(
        &mut self,
        cells: &mut CellStore,
        target: &Target,
        change: &CellChange,
    ) -> Result<(), CellError> {
        match target {
            Target::Wire { input_cell, .. } => {
                cells.set(*input_cell, change.current.clone(), false, self)?;
                Ok(())
            }
            Target::Node(_) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// ValueCell
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ValueCell {
    value: Value,
    subscribers: Vec<SubscriptionId>,
    notifying: bool,
}

// ---------------------------------------------------------------------------
// CellStore
// ---------------------------------------------------------------------------

/// Arena of cells and their subscriptions.
#[derive(Debug)]
pub struct CellStore {
    cells: SlotMap<CellId, ValueCell>,
    subscriptions: SlotMap<SubscriptionId, Subscription>,
    depth: u32,
    max_depth: u32,
    reentrancy: ReentrancyPolicy,
    reentrant_writes: u64,
}

impl Default for CellStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CellStore {
    pub fn new() -> Self {
        Self::with_limits(256, ReentrancyPolicy::Settle)
    }

    pub fn with_limits(max_depth: u32, reentrancy: ReentrancyPolicy) -> Self {
        Self {
            cells: SlotMap::with_key(),
            subscriptions: SlotMap::with_key(),
            depth: 0,
            max_depth,
            reentrancy,
            reentrant_writes: 0,
        }
    }

    pub fn create(&mut self, value: Value) -> CellId {
        self.cells.insert(ValueCell {
            value,
            subscribers: Vec::new(),
            notifying: false,
        })
    }

    /// Remove a cell and every subscription on it.
    pub fn remove(&mut self, id: CellId) {
        if let Some(cell) = self.cells.remove(id) {
            for sub in cell.subscribers {
                self.subscriptions.remove(sub);
            }
        }
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, id: CellId) -> Option<&Value> {
        self.cells.get(id).map(|c| &c.value)
    }

    pub fn kind(&self, id: CellId) -> Option<Kind> {
        self.get(id).map(Value::kind)
    }

    /// Number of writes that hit a cell while it was notifying.
    pub fn reentrant_writes(&self) -> u64 {
        self.reentrant_writes
    }

    /// Every cell's current value.
    pub fn values(&self) -> Vec<(CellId, Value)> {
        self.cells.iter().map(|(id, c)| (id, c.value.clone())).collect()
    }

    /// Put values back without notifying anyone. Cells removed since the
    /// values were taken are skipped.
    pub fn restore(&mut self, values: Vec<(CellId, Value)>) {
        for (id, value) in values {
            if let Some(cell) = self.cells.get_mut(id) {
                cell.value = value;
            }
        }
    }

    // -- Subscriptions --

    pub fn subscribe(&mut self, id: CellId, target: Target) -> Result<SubscriptionId, CellError> {
        self.attach(id, Listener::Target(target))
    }

    pub fn observe(&mut self, id: CellId, observer: Observer) -> Result<SubscriptionId, CellError> {
        self.attach(id, Listener::Observer(Some(observer)))
    }

    fn attach(&mut self, id: CellId, listener: Listener) -> Result<SubscriptionId, CellError> {
        if !self.cells.contains_key(id) {
            return Err(CellError::UnknownCell(id));
        }
        let sub = self.subscriptions.insert(Subscription { cell: id, listener });
        if let Some(cell) = self.cells.get_mut(id) {
            cell.subscribers.push(sub);
        }
        Ok(sub)
    }

    /// Drop one subscription. Returns `false` if it did not exist.
    pub fn unsubscribe(&mut self, sub: SubscriptionId) -> bool {
        let Some(subscription) = self.subscriptions.remove(sub) else {
            return false;
        };
        if let Some(cell) = self.cells.get_mut(subscription.cell) {
            cell.subscribers.retain(|s| *s != sub);
        }
        true
    }

    /// Drop every subscription on a cell. Returns how many were removed.
    pub fn unsubscribe_all(&mut self, id: CellId) -> usize {
        let Some(cell) = self.cells.get_mut(id) else {
            return 0;
        };
        let subs = std::mem::take(&mut cell.subscribers);
        for sub in &subs {
            self.subscriptions.remove(*sub);
        }
        subs.len()
    }

    pub fn subscriber_count(&self, id: CellId) -> usize {
        self.cells.get(id).map_or(0, |c| c.subscribers.len())
    }

    // -- Writes --

    /// Store a value and notify listeners in subscription order.
    ///
    /// Structurally equal values are ignored unless `force` is set.
    pub fn set<D: Dispatch + ?Sized>(
        &mut self,
        id: CellId,
        value: Value,
        force: bool,
        dispatch: &mut D,
    ) -> Result<SetOutcome, CellError> {
        let cell = self.cells.get_mut(id).ok_or(CellError::UnknownCell(id))?;

        if !force && cell.value.same(&value) {
            return Ok(SetOutcome::Unchanged);
        }

        if cell.notifying {
            return match self.reentrancy {
                ReentrancyPolicy::Settle => {
                    cell.value = value;
                    self.reentrant_writes += 1;
                    tracing::warn!(cell = ?id, "re-entrant write settled without notifying");
                    Ok(SetOutcome::Settled)
                }
                ReentrancyPolicy::Reject => Err(CellError::Reentrant(id)),
            };
        }

        if self.depth >= self.max_depth {
            return Err(CellError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        let previous = std::mem::replace(&mut cell.value, value.clone());
        let subscribers = cell.subscribers.clone();
        cell.notifying = true;
        self.depth += 1;

        let change = CellChange {
            cell: id,
            previous,
            current: value,
        };
        let result = self.notify(&subscribers, &change, dispatch);

        self.depth -= 1;
        if let Some(cell) = self.cells.get_mut(id) {
            cell.notifying = false;
        }
        result.map(|()| SetOutcome::Changed)
    }

    fn notify<D: Dispatch + ?Sized>(
        &mut self,
        subscribers: &[SubscriptionId],
        change: &CellChange,
        dispatch: &mut D,
    ) -> Result<(), CellError> {
        for &sub in subscribers {
            // A listener earlier in the list may have unsubscribed this one.
            let Some(subscription) = self.subscriptions.get_mut(sub) else {
                continue;
            };
            match &mut subscription.listener {
                Listener::Target(target) => {
                    let target = target.clone();
                    dispatch.deliver(self, &target, change)?;
                }
                Listener::Observer(slot) => {
                    let Some(mut observer) = slot.take() else {
                        continue;
                    };
                    let writes = observer(change);
                    if let Some(Subscription {
                        listener: Listener::Observer(slot),
                        ..
                    }) = self.subscriptions.get_mut(sub)
                    {
                        *slot = Some(observer);
                    }
                    for write in writes {
                        self.set(write.cell, write.value, write.force, dispatch)?;
                    }
                }
            }
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
