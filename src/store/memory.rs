use crate::store::{ThrottleKey, ThrottleWindow, WindowStore};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// A [WindowStore] that keeps windows in a [DashMap](dashmap::DashMap).
///
/// Windows live for the lifetime of the process; key cardinality is bounded by
/// active subjects and commands, so entries are never evicted.
#[derive(Default)]
pub struct InMemoryStore {
    map: DashMap<ThrottleKey, ThrottleWindow>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowStore for InMemoryStore {
    fn try_get(&self, key: &ThrottleKey) -> Option<ThrottleWindow> {
        self.map.get(key).map(|w| *w)
    }

    fn try_insert(&self, key: ThrottleKey, window: ThrottleWindow) -> bool {
        match self.map.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(window);
                true
            }
        }
    }

    fn try_compare_and_swap(
        &self,
        key: &ThrottleKey,
        expected: ThrottleWindow,
        new: ThrottleWindow,
    ) -> bool {
        match self.map.get_mut(key) {
            Some(mut stored) if *stored == expected => {
                *stored = new;
                true
            }
            _ => false,
        }
    }

    fn try_remove(&self, key: &ThrottleKey, expected: ThrottleWindow) -> bool {
        self.map.remove_if(key, |_, stored| *stored == expected).is_some()
    }
}
