//! Internal release bag for scope-owned cleanup hooks.

/// Container for release hooks with LIFO execution order.
///
/// A scope pushes one hook per resource it hands out; ending the scope pops
/// and runs them newest first, so later acquisitions are released before the
/// ones they may depend on.
#[derive(Default)]
pub(crate) struct ReleaseBag {
    hooks: Vec<Box<dyn FnOnce() + Send>>,
}

impl ReleaseBag {
    /// Add a release hook.
    pub(crate) fn push(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.hooks.push(f);
    }

    /// Take every hook, leaving the bag empty.
    ///
    /// Callers run the returned hooks outside the lock guarding the bag, so a
    /// hook that touches the owning scope cannot deadlock.
    pub(crate) fn drain(&mut self) -> ReleaseBag {
        std::mem::take(self)
    }

    /// Execute all hooks in reverse order (LIFO). Returns how many ran.
    pub(crate) fn run_all_reverse(&mut self) -> usize {
        let mut ran = 0;
        while let Some(f) = self.hooks.pop() {
            (f)();
            ran += 1;
        }
        ran
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Check if the bag is empty (no hooks registered).
    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn hooks_run_newest_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bag = ReleaseBag::default();
        for i in 0..3 {
            let order = order.clone();
            bag.push(Box::new(move || order.lock().unwrap().push(i)));
        }

        let mut taken = bag.drain();
        assert!(bag.is_empty());
        assert_eq!(taken.len(), 3);
        assert_eq!(taken.run_all_reverse(), 3);
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }
}
