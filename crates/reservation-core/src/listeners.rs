use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

/// Token returned on registration; pass it back to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

pub type Listener<T> = Rc<dyn Fn(Option<T>)>;

/// Ordered set of callbacks. Registering the same `Rc` twice is a no-op
/// that returns the original token.
pub struct ListenerSet<T> {
    entries: Vec<(ListenerId, Listener<T>)>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("ids", &self.entries.iter().map(|(id, _)| *id).collect::<Vec<_>>())
            .finish()
    }
}

impl<T: Copy> ListenerSet<T> {
    pub fn add(&mut self, listener: Listener<T>) -> ListenerId {
        if let Some((id, _)) = self
            .entries
            .iter()
            .find(|(_, existing)| Rc::ptr_eq(existing, &listener))
        {
            return *id;
        }

        let id = ListenerId(Uuid::new_v4());
        self.entries.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    pub fn notify(&self, value: Option<T>) {
        for (_, listener) in &self.entries {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
