use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::types::{Key, KeyEvent, KeyState};

/// Callback run on the thread that delivered the key event.
pub type KeyCallback = Arc<dyn Fn(&KeyEvent) + Send + Sync>;

/// Handle returned by [`InputTracker::subscribe`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SubscriptionId(u64);

/// Thread-safe pressed-key map plus per-key subscribers.
///
/// Share it as `Arc<InputTracker>` between the window-event side, which feeds
/// transitions in, and whoever polls key state. Keys never seen read as
/// released.
#[derive(Default)]
pub struct InputTracker {
    pressed: RwLock<HashMap<Key, bool>>,
    subscribers: Mutex<HashMap<Key, Vec<(SubscriptionId, KeyCallback)>>>,
    next_id: AtomicU64,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.read().get(&key).copied().unwrap_or(false)
    }

    /// Keys currently held, in no particular order.
    pub fn pressed_keys(&self) -> Vec<Key> {
        self.pressed
            .read()
            .iter()
            .filter_map(|(k, down)| down.then_some(*k))
            .collect()
    }

    pub fn key_down(&self, key: Key) {
        self.apply(KeyEvent::pressed(key));
    }

    pub fn key_up(&self, key: Key) {
        self.apply(KeyEvent::released(key));
    }

    /// Records the transition, then runs `event.key`'s subscribers in
    /// subscription order.
    pub fn apply(&self, event: KeyEvent) {
        self.pressed
            .write()
            .insert(event.key, event.state == KeyState::Pressed);

        // Callbacks run without the lock held so they may (un)subscribe.
        let callbacks: Vec<KeyCallback> = self
            .subscribers
            .lock()
            .get(&event.key)
            .map(|subs| subs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();

        for cb in callbacks {
            cb(&event);
        }
    }

    /// Registers `callback` for transitions of `key`.
    pub fn subscribe<F>(&self, key: Key, callback: F) -> SubscriptionId
    where
        F: Fn(&KeyEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .entry(key)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Removes a subscription. Returns false if it was not registered for `key`.
    pub fn unsubscribe(&self, key: Key, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let Some(subs) = subscribers.get_mut(&key) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        let removed = subs.len() != before;
        if subs.is_empty() {
            subscribers.remove(&key);
        }
        removed
    }

    pub fn subscriber_count(&self, key: Key) -> usize {
        self.subscribers.lock().get(&key).map_or(0, Vec::len)
    }

    /// Marks every held key released without notifying subscribers.
    ///
    /// Used on focus loss, when the matching key-up events will never arrive.
    pub fn release_all(&self) {
        let mut pressed = self.pressed.write();
        let held = pressed.values().filter(|down| **down).count();
        pressed.clear();
        if held > 0 {
            log::debug!("focus lost: released {held} held key(s)");
        }
    }
}

impl std::fmt::Debug for InputTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputTracker")
            .field("pressed", &self.pressed_keys())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use super::*;

    fn counter(tracker: &InputTracker, key: Key) -> (SubscriptionId, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let id = tracker.subscribe(key, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (id, hits)
    }

    // ── pressed map ───────────────────────────────────────────────────────

    #[test]
    fn unseen_keys_are_released() {
        let t = InputTracker::new();
        assert!(!t.is_pressed(Key::A));
        assert!(!t.is_pressed(Key::Unknown(1234)));
    }

    #[test]
    fn down_then_up() {
        let t = InputTracker::new();
        t.key_down(Key::W);
        assert!(t.is_pressed(Key::W));
        assert!(!t.is_pressed(Key::S));
        assert_eq!(t.pressed_keys(), vec![Key::W]);

        t.key_up(Key::W);
        assert!(!t.is_pressed(Key::W));
        assert!(t.pressed_keys().is_empty());
    }

    #[test]
    fn release_all_clears_without_callbacks() {
        let t = InputTracker::new();
        let (_, hits) = counter(&t, Key::Space);
        t.key_down(Key::Space);
        t.key_down(Key::Shift);

        t.release_all();
        assert!(!t.is_pressed(Key::Space));
        assert!(!t.is_pressed(Key::Shift));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    // ── subscribers ───────────────────────────────────────────────────────

    #[test]
    fn subscriber_sees_each_transition_once() {
        let t = InputTracker::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        t.subscribe(Key::Escape, move |ev| s.lock().push((ev.key, ev.state)));

        t.key_down(Key::Escape);
        t.key_up(Key::Escape);

        assert_eq!(
            *seen.lock(),
            vec![
                (Key::Escape, KeyState::Pressed),
                (Key::Escape, KeyState::Released)
            ]
        );
    }

    #[test]
    fn other_keys_do_not_notify() {
        let t = InputTracker::new();
        let (_, hits) = counter(&t, Key::A);
        t.key_down(Key::B);
        t.key_up(Key::B);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn state_is_updated_before_callbacks_run() {
        let t = Arc::new(InputTracker::new());
        let observed = Arc::new(Mutex::new(None));
        let (t2, o) = (Arc::clone(&t), Arc::clone(&observed));
        t.subscribe(Key::Enter, move |_| *o.lock() = Some(t2.is_pressed(Key::Enter)));

        t.key_down(Key::Enter);
        assert_eq!(*observed.lock(), Some(true));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let t = InputTracker::new();
        let (id, hits) = counter(&t, Key::Q);
        let (_, other) = counter(&t, Key::Q);
        assert_eq!(t.subscriber_count(Key::Q), 2);

        assert!(t.unsubscribe(Key::Q, id));
        assert!(!t.unsubscribe(Key::Q, id));
        assert!(!t.unsubscribe(Key::E, id));

        t.key_down(Key::Q);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(other.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let t = Arc::new(InputTracker::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let (t2, h, s) = (Arc::clone(&t), Arc::clone(&hits), Arc::clone(&slot));
        let id = t.subscribe(Key::F1, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *s.lock() {
                t2.unsubscribe(Key::F1, id);
            }
        });
        *slot.lock() = Some(id);

        t.key_down(Key::F1);
        t.key_down(Key::F1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(t.subscriber_count(Key::F1), 0);
    }

    #[test]
    fn repeat_flag_is_forwarded() {
        let t = InputTracker::new();
        let repeats = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&repeats);
        t.subscribe(Key::D, move |ev| {
            if ev.repeat {
                r.fetch_add(1, Ordering::SeqCst);
            }
        });

        t.apply(KeyEvent::pressed(Key::D));
        t.apply(KeyEvent {
            repeat: true,
            ..KeyEvent::pressed(Key::D)
        });
        assert_eq!(repeats.load(Ordering::SeqCst), 1);
        assert!(t.is_pressed(Key::D));
    }

    // ── threads ───────────────────────────────────────────────────────────

    #[test]
    fn concurrent_writers_and_readers() {
        let t = Arc::new(InputTracker::new());
        let keys = [Key::A, Key::B, Key::C, Key::D];

        let writers: Vec<_> = keys
            .into_iter()
            .map(|key| {
                let t = Arc::clone(&t);
                thread::spawn(move || {
                    for _ in 0..500 {
                        t.key_down(key);
                        t.key_up(key);
                    }
                    t.key_down(key);
                })
            })
            .collect();

        let reader = {
            let t = Arc::clone(&t);
            thread::spawn(move || {
                for _ in 0..2000 {
                    let _ = t.is_pressed(Key::A);
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        assert!(keys.iter().all(|k| t.is_pressed(*k)));
    }
}
