use std::thread::{self, ThreadId};

/// A resource that may only be used on the thread that activated it.
///
/// Graphics contexts are current on at most one thread at a time. Wrapping
/// the handles that depend on a current context in `ThreadBound` turns
/// cross-thread use into a debug assertion instead of silent driver
/// corruption.
#[derive(Debug)]
pub struct ThreadBound<T> {
    value: T,
    owner: Option<ThreadId>,
}

impl<T> ThreadBound<T> {
    /// Wraps `value` without binding it to any thread yet.
    pub fn unbound(value: T) -> Self {
        Self { value, owner: None }
    }

    /// Wraps `value` and binds it to the calling thread.
    pub fn bound_here(value: T) -> Self {
        Self {
            value,
            owner: Some(thread::current().id()),
        }
    }

    /// Records the calling thread as the owner.
    pub fn bind_to_current_thread(&mut self) {
        self.owner = Some(thread::current().id());
    }

    pub fn unbind(&mut self) {
        self.owner = None;
    }

    pub fn is_bound_here(&self) -> bool {
        self.owner == Some(thread::current().id())
    }

    pub fn get(&self) -> &T {
        debug_assert!(
            self.is_bound_here(),
            "thread-bound resource used on {:?} while bound to {:?}",
            thread::current().id(),
            self.owner
        );
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        debug_assert!(
            self.is_bound_here(),
            "thread-bound resource used on {:?} while bound to {:?}",
            thread::current().id(),
            self.owner
        );
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}
