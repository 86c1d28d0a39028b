//! Process-level string interner.
//!
//! String and wide-string constant values carry opaque `StringId`s instead of
//! text; two constants are equal exactly when their ids are equal. The pool
//! is process-global and internally synchronized so that translation units
//! checked on different threads share one id space.

use std::sync::{Arc, OnceLock, RwLock};

use rustc_hash::FxHashMap;

/// Opaque stable id of an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    /// The canonical text behind this id.
    pub fn resolve(self) -> Arc<str> {
        pool().read().expect("interner poisoned").strings[self.0 as usize].clone()
    }
}

impl std::fmt::Display for StringId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resolve())
    }
}

#[derive(Default)]
struct Pool {
    ids: FxHashMap<Arc<str>, StringId>,
    strings: Vec<Arc<str>>,
}

fn pool() -> &'static RwLock<Pool> {
    static POOL: OnceLock<RwLock<Pool>> = OnceLock::new();
    POOL.get_or_init(|| RwLock::new(Pool::default()))
}

/// Intern `text`, returning its stable id.
pub fn intern(text: &str) -> StringId {
    {
        let pool = pool().read().expect("interner poisoned");
        if let Some(&id) = pool.ids.get(text) {
            return id;
        }
    }
    let mut pool = pool().write().expect("interner poisoned");
    if let Some(&id) = pool.ids.get(text) {
        return id;
    }
    let id = StringId(pool.strings.len() as u32);
    let shared: Arc<str> = Arc::from(text);
    pool.strings.push(shared.clone());
    pool.ids.insert(shared, id);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_stable_ids() {
        let a = intern("hello");
        let b = intern("hello");
        let c = intern("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(&*a.resolve(), "hello");
        assert_eq!(&*c.resolve(), "world");
    }

    #[test]
    fn test_intern_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| intern("shared")))
            .collect();
        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }
}
