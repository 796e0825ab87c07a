use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::SWITCH_REGISTER_COUNT;
use crate::wire::{CacheKey, CacheValue};

/// One register: a packed `(key, value)` word and its valid bit.
///
/// The valid bit is only ever set, so a reader that observed it set reads
/// a whole entry written by some `write`.
#[derive(Debug)]
struct Slot {
    valid: AtomicBool,
    entry: AtomicU64,
}

impl Slot {
    const fn new() -> Slot {
        Slot {
            valid: AtomicBool::new(false),
            entry: AtomicU64::new(0),
        }
    }

    const fn pack(key: CacheKey, value: CacheValue) -> u64 {
        ((key as u64) << 32) | value as u64
    }

    const fn unpack(entry: u64) -> (CacheKey, CacheValue) {
        ((entry >> 32) as CacheKey, entry as CacheValue)
    }
}

/// The dynamic cache: a direct-mapped bank of `N` registers.
///
/// Every key maps to the slot `key mod N`. Keys `k` and `k + N` therefore
/// share a slot, and learning one evicts the other. Reads return what the
/// slot holds; callers must compare the stored key before trusting the value,
/// or use [lookup].
///
/// [lookup]: #method.lookup
pub struct RegisterBank<const N: usize = SWITCH_REGISTER_COUNT> {
    slots: [Slot; N],
}

impl<const N: usize> RegisterBank<N> {
    const NOT_EMPTY: () = assert!(N > 0, "register bank needs at least one slot");

    /// Creates a bank with every slot invalid.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NOT_EMPTY;
        RegisterBank {
            slots: core::array::from_fn(|_| Slot::new()),
        }
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Index of the slot `key` is stored in.
    pub const fn index_of(key: CacheKey) -> usize {
        key as usize % N
    }

    /// Return the contents of the slot `key` maps to, if that slot was ever written.
    ///
    /// The stored key may differ from `key` when another key sharing the slot
    /// was learned more recently.
    pub fn read(&self, key: CacheKey) -> Option<(CacheKey, CacheValue)> {
        let slot = &self.slots[Self::index_of(key)];
        if !slot.valid.load(Ordering::Acquire) {
            return None;
        }
        Some(Slot::unpack(slot.entry.load(Ordering::Acquire)))
    }

    /// Return the value learned for exactly `key`.
    pub fn lookup(&self, key: CacheKey) -> Option<CacheValue> {
        match self.read(key) {
            Some((stored_key, value)) if stored_key == key => Some(value),
            _ => None,
        }
    }

    /// Overwrite the slot `key` maps to with `(key, value)` and mark it valid.
    pub fn write(&self, key: CacheKey, value: CacheValue) {
        let slot = &self.slots[Self::index_of(key)];
        slot.entry
            .store(Slot::pack(key, value), Ordering::Release);
        slot.valid.store(true, Ordering::Release);
    }

    /// Number of slots holding an entry.
    pub fn occupied(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.valid.load(Ordering::Relaxed))
            .count()
    }
}

impl<const N: usize> Default for RegisterBank<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for RegisterBank<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RegisterBank")
            .field("capacity", &N)
            .field("occupied", &self.occupied())
            .finish()
    }
}
