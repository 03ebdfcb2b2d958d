use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::ShaderError;

/// Identity of a compiled shader: the source file plus a caller-chosen name.
///
/// Paths that resolve on disk are stored canonicalized, so different
/// spellings of one file share a key. Paths that do not resolve compare by
/// their literal text.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ShaderKey {
    pub path: PathBuf,
    pub name: String,
}

impl ShaderKey {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            path: path.canonicalize().unwrap_or(path),
            name: name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

type Slot<T> = Arc<Mutex<Option<Arc<T>>>>;

/// Compiled shaders keyed by [`ShaderKey`], shared by every program.
///
/// Each key compiles at most once. Concurrent requests for the same key wait
/// on the first compile and then share its result; requests for different
/// keys do not block each other. A failed compile is not stored, so the next
/// request retries.
pub struct ShaderCache<T = super::CompiledShader> {
    slots: Mutex<HashMap<ShaderKey, Slot<T>>>,
}

impl<T> Default for ShaderCache<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> ShaderCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, running `compile` if there is none.
    pub fn get_or_compile<F>(&self, key: &ShaderKey, compile: F) -> Result<Arc<T>, ShaderError>
    where
        F: FnOnce(&ShaderKey) -> Result<T, ShaderError>,
    {
        // The map lock is held only long enough to find the key's slot.
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut entry = slot.lock();
        if let Some(hit) = entry.as_ref() {
            log::trace!("shader cache hit: {key}");
            return Ok(Arc::clone(hit));
        }

        log::debug!("compiling shader {key}");
        let compiled = Arc::new(compile(key)?);
        *entry = Some(Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Cached value for `key`, without compiling.
    pub fn peek(&self, key: &ShaderKey) -> Option<Arc<T>> {
        let slot = self.slots.lock().get(key).cloned()?;
        let entry = slot.lock();
        entry.clone()
    }

    pub fn contains(&self, key: &ShaderKey) -> bool {
        self.peek(key).is_some()
    }

    /// Number of successfully compiled entries.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot<T>> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|s| s.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry. Programs holding an `Arc` keep theirs alive.
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        if !slots.is_empty() {
            log::debug!("clearing shader cache ({} keys)", slots.len());
        }
        slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn key(name: &str) -> ShaderKey {
        ShaderKey::new(format!("unresolved/{name}.wgsl"), name)
    }

    // ── single compile ────────────────────────────────────────────────────

    #[test]
    fn second_request_is_a_hit() {
        let cache: ShaderCache<u32> = ShaderCache::new();
        let calls = AtomicUsize::new(0);
        let compile = |_: &ShaderKey| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        };

        let a = cache.get_or_compile(&key("color"), compile).unwrap();
        let b = cache.get_or_compile(&key("color"), compile).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn name_and_path_both_distinguish_keys() {
        let cache: ShaderCache<&'static str> = ShaderCache::new();
        cache
            .get_or_compile(&ShaderKey::new("a.wgsl", "x"), |_| Ok("ax"))
            .unwrap();
        cache
            .get_or_compile(&ShaderKey::new("a.wgsl", "y"), |_| Ok("ay"))
            .unwrap();
        cache
            .get_or_compile(&ShaderKey::new("b.wgsl", "x"), |_| Ok("bx"))
            .unwrap();

        assert_eq!(cache.len(), 3);
        assert_eq!(*cache.peek(&ShaderKey::new("a.wgsl", "y")).unwrap(), "ay");
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn failure_is_not_cached() {
        let cache: ShaderCache<u32> = ShaderCache::new();
        let k = key("broken");
        let err = ShaderError::Parse {
            name: "broken".into(),
            message: "unexpected token".into(),
        };

        let first = cache.get_or_compile(&k, |_| Err(err.clone()));
        assert_eq!(first.unwrap_err(), err);
        assert!(!cache.contains(&k));
        assert!(cache.is_empty());

        let retried = cache.get_or_compile(&k, |_| Ok(1)).unwrap();
        assert_eq!(*retried, 1);
        assert!(cache.contains(&k));
    }

    // ── concurrency ───────────────────────────────────────────────────────

    #[test]
    fn concurrent_requests_compile_once() {
        const THREADS: usize = 8;

        let cache: Arc<ShaderCache<usize>> = Arc::new(ShaderCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_compile(&key("shared"), |_| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(42)
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<Arc<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[test]
    fn distinct_keys_compile_independently() {
        let cache: Arc<ShaderCache<String>> = Arc::new(ShaderCache::new());

        let handles: Vec<_> = ["color", "texture", "depth", "font"]
            .into_iter()
            .map(|name| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache
                        .get_or_compile(&key(name), |k| Ok(k.name.clone()))
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(cache.len(), 4);
    }

    // ── clear ─────────────────────────────────────────────────────────────

    #[test]
    fn clear_keeps_outstanding_handles_alive() {
        let cache: ShaderCache<u32> = ShaderCache::new();
        let held = cache.get_or_compile(&key("color"), |_| Ok(3)).unwrap();

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(*held, 3);

        let calls = AtomicUsize::new(0);
        cache
            .get_or_compile(&key("color"), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(4)
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn key_display_names_file() {
        let k = ShaderKey::new("unresolved/color.wgsl", "color");
        assert_eq!(k.to_string(), "color (unresolved/color.wgsl)");
    }

    #[test]
    fn path_spellings_of_one_file_share_a_key() {
        let dir = std::env::temp_dir().join(format!("prism-cache-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("shaders")).unwrap();
        std::fs::write(dir.join("shaders/color.wgsl"), "").unwrap();

        let plain = ShaderKey::new(dir.join("shaders/color.wgsl"), "color");
        let dotted = ShaderKey::new(dir.join("./shaders/../shaders/color.wgsl"), "color");
        assert_eq!(plain, dotted);

        let cache: ShaderCache<u32> = ShaderCache::new();
        let calls = AtomicUsize::new(0);
        for k in [&plain, &dotted] {
            cache
                .get_or_compile(k, |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }
}
