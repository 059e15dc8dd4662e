//! Gapless playback scheduling for inbound speech chunks.
//!
//! Synthesized speech arrives as a stream of short PCM chunks. Playing each
//! chunk the moment it arrives would stack them; waiting for one to finish
//! before starting the next would leave gaps. [`PlaybackScheduler`] keeps a
//! single scheduling clock instead: every chunk is scheduled to start at
//! `max(next_start_time, output clock)` and the clock advances by the chunk's
//! duration, so consecutive chunks render back to back with neither gap nor
//! overlap.
//!
//! Barge-in support: [`PlaybackScheduler::interrupt`] force-stops every
//! in-flight source, clears the active set, and resets the clock to zero,
//! all under one lock so a chunk arriving concurrently can never be scheduled
//! against a stale clock.
//!
//! The actual audio rendering lives behind [`OutputSink`] so the scheduler is
//! testable without a device.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::PLAYBACK_SAMPLE_RATE;

/// Identifier for one scheduled playback source.
pub type SourceId = u64;

/// Rendering backend for scheduled audio.
///
/// Implementations mix scheduled mono buffers into the output device (or a
/// test fake). All timestamps are seconds on the sink's own monotonic clock.
pub trait OutputSink: Send + Sync {
    /// Current position of the output clock, in seconds.
    fn clock(&self) -> f64;

    /// Schedule a mono buffer at the pipeline playback rate to begin at
    /// `start_at` seconds on the sink clock.
    fn schedule(&self, id: SourceId, samples: Vec<f32>, start_at: f64);

    /// Force-stop a source immediately. Unknown IDs are ignored.
    fn stop(&self, id: SourceId);

    /// Source IDs that finished rendering naturally since the last call.
    fn drain_finished(&self) -> Vec<SourceId>;

    /// Release the output path. Further calls are no-ops.
    fn shutdown(&self);
}

/// Outcome of scheduling one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduled {
    /// Source ID assigned to the chunk
    pub id: SourceId,
    /// Start offset on the sink clock, in seconds
    pub start_at: f64,
    /// Chunk duration in seconds
    pub duration: f64,
}

struct SchedulerState {
    next_start_time: f64,
    active: HashSet<SourceId>,
}

/// Schedules decoded speech chunks for gapless playback on an [`OutputSink`].
///
/// The active-source set and the scheduling clock live behind one mutex;
/// [`enqueue`](Self::enqueue) and [`interrupt`](Self::interrupt) each hold it
/// for their whole critical section, which keeps interruption atomic with
/// respect to concurrently arriving chunks.
pub struct PlaybackScheduler {
    sink: Arc<dyn OutputSink>,
    state: Mutex<SchedulerState>,
    next_id: AtomicU64,
    sample_rate: u32,
}

impl PlaybackScheduler {
    /// Create a scheduler rendering through `sink` at the pipeline playback
    /// rate.
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(SchedulerState {
                next_start_time: 0.0,
                active: HashSet::new(),
            }),
            next_id: AtomicU64::new(1),
            sample_rate: PLAYBACK_SAMPLE_RATE,
        }
    }

    /// Schedule a decoded chunk. Returns `None` for an empty chunk.
    ///
    /// The chunk starts at `max(next_start_time, sink clock)` so it can never
    /// be scheduled into the past, and the clock then advances by the chunk
    /// duration.
    pub fn enqueue(&self, samples: Vec<f32>) -> Option<Scheduled> {
        if samples.is_empty() {
            return None;
        }
        let duration = samples.len() as f64 / self.sample_rate as f64;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.lock();
        self.reap_locked(&mut state);

        let start_at = state.next_start_time.max(self.sink.clock());
        self.sink.schedule(id, samples, start_at);
        state.active.insert(id);
        state.next_start_time = start_at + duration;

        trace!(id, start_at, duration, "scheduled playback chunk");
        Some(Scheduled {
            id,
            start_at,
            duration,
        })
    }

    /// Stop every in-flight source, clear the active set, and reset the
    /// scheduling clock to zero.
    ///
    /// Holds the state lock across the whole operation; a chunk arriving
    /// concurrently is either fully scheduled before the interruption (and
    /// then stopped with the rest) or scheduled after it against the reset
    /// clock.
    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        let stopped = state.active.len();
        for id in state.active.drain() {
            self.sink.stop(id);
        }
        // discard completion records for sources that no longer exist
        self.sink.drain_finished();
        state.next_start_time = 0.0;
        debug!(stopped, "playback interrupted");
    }

    /// Number of sources scheduled but not yet finished.
    pub fn active_sources(&self) -> usize {
        let mut state = self.state.lock();
        self.reap_locked(&mut state);
        state.active.len()
    }

    /// Timestamp at which the next chunk would begin, in seconds.
    pub fn next_start_time(&self) -> f64 {
        self.state.lock().next_start_time
    }

    fn reap_locked(&self, state: &mut SchedulerState) {
        for id in self.sink.drain_finished() {
            state.active.remove(&id);
        }
    }
}
