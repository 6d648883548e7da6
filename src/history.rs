// src/history.rs
//
// Process-wide store of per-track label histories.
//
// Design:
//   - RwLock over the key map, one Mutex per entry. Updates for
//     different tracks (e.g. several camera pipelines sharing the
//     store) only contend on the brief map read lock.
//   - Same-key updates are serialized by the caller: one pipeline
//     instance owns one stream and processes its frames in order.
//   - `sweep` collects stale keys under the read lock, then removes
//     them one at a time under the write lock, re-checking staleness
//     so a track that reappeared between the two phases survives.
//   - Memory is bounded by live tracks x window, never by total
//     frames processed.

use crate::types::{Label, TrackKey};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

struct TrackEntry {
    labels: VecDeque<Label>,
    last_seen_frame_seq: u64,
}

pub struct TrackHistoryStore {
    entries: RwLock<HashMap<TrackKey, Arc<Mutex<TrackEntry>>>>,
    /// Voting window N. Histories never exceed this length.
    window: usize,
}

impl TrackHistoryStore {
    pub fn new(window: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Append one observed label to a track, creating the entry on the
    /// first observation for the key. Drops the oldest label when the
    /// window is full.
    pub fn update(&self, key: TrackKey, label: Label, frame_seq: u64) {
        let entry = {
            let entries = self.entries.read().expect("history map poisoned");
            entries.get(&key).cloned()
        };

        let entry = match entry {
            Some(entry) => entry,
            None => {
                let mut entries = self.entries.write().expect("history map poisoned");
                let created = entries
                    .entry(key)
                    .or_insert_with(|| {
                        info!("🆕 New track {}", key);
                        Arc::new(Mutex::new(TrackEntry {
                            labels: VecDeque::with_capacity(self.window),
                            last_seen_frame_seq: frame_seq,
                        }))
                    })
                    .clone();
                created
            }
        };

        let mut entry = entry.lock().expect("track entry poisoned");
        entry.labels.push_back(label);
        if entry.labels.len() > self.window {
            entry.labels.pop_front();
        }
        entry.last_seen_frame_seq = frame_seq;
    }

    /// Point-in-time copy of a track's history, oldest first.
    /// Returns None for tracks the store has never seen or has evicted.
    pub fn snapshot(&self, key: TrackKey) -> Option<Vec<Label>> {
        let entry = {
            let entries = self.entries.read().expect("history map poisoned");
            entries.get(&key).cloned()
        }?;
        let entry = entry.lock().expect("track entry poisoned");
        Some(entry.labels.iter().cloned().collect())
    }

    /// Evict every track not seen for more than `staleness_window`
    /// frames. Cost is O(live tracks); the write lock is held only for
    /// one entry's removal at a time so unrelated updates are not
    /// stalled behind the whole sweep.
    pub fn sweep(&self, current_frame_seq: u64, staleness_window: u64) -> usize {
        let stale: Vec<TrackKey> = {
            let entries = self.entries.read().expect("history map poisoned");
            entries
                .iter()
                .filter(|(_, entry)| {
                    let entry = entry.lock().expect("track entry poisoned");
                    current_frame_seq.saturating_sub(entry.last_seen_frame_seq) > staleness_window
                })
                .map(|(key, _)| *key)
                .collect()
        };

        let mut removed = 0;
        for key in stale {
            let mut entries = self.entries.write().expect("history map poisoned");
            if let Some(entry) = entries.get(&key) {
                let last_seen = entry
                    .lock()
                    .expect("track entry poisoned")
                    .last_seen_frame_seq;
                // Re-check: the track may have been updated since the scan
                if current_frame_seq.saturating_sub(last_seen) > staleness_window {
                    entries.remove(&key);
                    removed += 1;
                    info!(
                        "🗑️  Evicted track {} — not seen for {} frames",
                        key,
                        current_frame_seq.saturating_sub(last_seen)
                    );
                }
            }
        }

        if removed > 0 {
            debug!("Sweep at frame {} removed {} stale track(s)", current_frame_seq, removed);
        }
        removed
    }

    /// Drop every track belonging to one stream. Called on pipeline
    /// shutdown so a finished stream releases its memory immediately.
    pub fn remove_stream(&self, stream: u32) -> usize {
        let mut entries = self.entries.write().expect("history map poisoned");
        let before = entries.len();
        entries.retain(|key, _| key.stream != stream);
        let removed = before - entries.len();
        if removed > 0 {
            info!("🗑️  Stream {} shut down, released {} track(s)", stream, removed);
        }
        removed
    }

    pub fn live_tracks(&self) -> usize {
        self.entries.read().expect("history map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_tracks() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn key(track: u32) -> TrackKey {
        TrackKey::new(0, track)
    }

    #[test]
    fn test_history_is_bounded_by_window() {
        let store = TrackHistoryStore::new(5);
        for seq in 0..100 {
            store.update(key(1), Label::class("plastic"), seq);
            let len = store.snapshot(key(1)).unwrap().len();
            assert!(len <= 5, "history grew to {} at frame {}", len, seq);
        }
        assert_eq!(store.snapshot(key(1)).unwrap().len(), 5);
    }

    #[test]
    fn test_window_drops_oldest_first() {
        let store = TrackHistoryStore::new(3);
        store.update(key(1), Label::class("glass"), 0);
        store.update(key(1), Label::class("metal"), 1);
        store.update(key(1), Label::class("paper"), 2);
        store.update(key(1), Label::class("plastic"), 3);

        let history = store.snapshot(key(1)).unwrap();
        assert_eq!(
            history,
            vec![
                Label::class("metal"),
                Label::class("paper"),
                Label::class("plastic")
            ]
        );
    }

    #[test]
    fn test_snapshot_of_unseen_track_is_absent() {
        let store = TrackHistoryStore::new(5);
        assert!(store.snapshot(key(42)).is_none());
    }

    #[test]
    fn test_sweep_evicts_stale_track() {
        // Last seen at frame 60; 100 - 60 = 40 exceeds the 30-frame window
        let store = TrackHistoryStore::new(10);
        store.update(key(7), Label::class("battery"), 60);

        let removed = store.sweep(100, 30);
        assert_eq!(removed, 1);
        assert!(store.snapshot(key(7)).is_none());
    }

    #[test]
    fn test_sweep_keeps_track_within_staleness_window() {
        let store = TrackHistoryStore::new(10);
        store.update(key(7), Label::class("battery"), 80);

        // 100 - 80 = 20, not older than the 30-frame window
        let removed = store.sweep(100, 30);
        assert_eq!(removed, 0);
        assert!(store.snapshot(key(7)).is_some());
    }

    #[test]
    fn test_sweep_boundary_is_strictly_greater() {
        let store = TrackHistoryStore::new(10);
        store.update(key(1), Label::class("glass"), 70);
        // Exactly at the window: 100 - 70 = 30, not stale yet
        assert_eq!(store.sweep(100, 30), 0);
        // One frame later it is
        assert_eq!(store.sweep(101, 30), 1);
    }

    #[test]
    fn test_remove_stream_only_touches_that_stream() {
        let store = TrackHistoryStore::new(5);
        store.update(TrackKey::new(0, 1), Label::class("glass"), 0);
        store.update(TrackKey::new(1, 1), Label::class("metal"), 0);
        store.update(TrackKey::new(1, 2), Label::class("paper"), 0);

        assert_eq!(store.remove_stream(1), 2);
        assert!(store.snapshot(TrackKey::new(0, 1)).is_some());
        assert!(store.snapshot(TrackKey::new(1, 1)).is_none());
        assert_eq!(store.live_tracks(), 1);
    }

    #[test]
    fn test_concurrent_updates_on_disjoint_keys() {
        let store = Arc::new(TrackHistoryStore::new(10));
        let mut handles = Vec::new();

        // Four "streams", each appending in frame order to its own keys
        for stream in 0..4u32 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for seq in 0..200u64 {
                    for track in 0..5u32 {
                        store.update(
                            TrackKey::new(stream, track),
                            Label::class("plastic"),
                            seq,
                        );
                    }
                }
            }));
        }

        // Concurrent sweeps must not disturb live tracks
        {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for seq in 0..200u64 {
                    store.sweep(seq, 300);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.live_tracks(), 20);
        for stream in 0..4u32 {
            for track in 0..5u32 {
                let history = store.snapshot(TrackKey::new(stream, track)).unwrap();
                assert_eq!(history.len(), 10);
                assert!(history.iter().all(|l| *l == Label::class("plastic")));
            }
        }
    }
}
