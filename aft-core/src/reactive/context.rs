//! Tracking Context
//!
//! The tracking context answers one question: "which computation is
//! currently running?" When a tracked container is read, the store
//! attributes the read to the computation at the top of a thread-local
//! stack.
//!
//! A stack (rather than a single slot) is what makes nesting correct: while
//! an effect's body registers another effect, or a computed cache
//! recomputes inside an outer computation, reads attribute to the innermost
//! computation only. The previous frame is restored when the inner one
//! finishes via a drop guard, so the stack unwinds correctly even if a
//! computation panics.

use smallvec::SmallVec;
use std::cell::RefCell;

use super::store::{Key, SubscriberId, TargetId};

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// One entry on the tracking stack: the running computation and the reads
/// observed so far during its current execution.
struct Frame {
    subscriber_id: SubscriberId,
    reads: SmallVec<[(TargetId, Key); 8]>,
}

/// Guard for a tracking frame; pops the frame when dropped.
pub struct TrackingContext {
    subscriber_id: SubscriberId,
}

impl TrackingContext {
    /// Push a tracking frame for `subscriber_id`.
    ///
    /// Reads made while the returned guard is alive attribute to this
    /// subscriber, until a nested frame shadows it.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        FRAMES.with(|frames| {
            frames.borrow_mut().push(Frame {
                subscriber_id,
                reads: SmallVec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Whether any computation is currently being tracked on this thread.
    pub fn is_active() -> bool {
        FRAMES.with(|frames| !frames.borrow().is_empty())
    }

    /// The innermost running computation, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        FRAMES.with(|frames| frames.borrow().last().map(|frame| frame.subscriber_id))
    }

    /// Record a read against the innermost frame. Called by the store.
    pub fn record_read(target: TargetId, key: Key) {
        FRAMES.with(|frames| {
            if let Some(frame) = frames.borrow_mut().last_mut() {
                frame.reads.push((target, key));
            }
        });
    }

    /// The reads observed so far in the innermost frame.
    pub fn current_reads() -> Vec<(TargetId, Key)> {
        FRAMES.with(|frames| {
            frames
                .borrow()
                .last()
                .map(|frame| frame.reads.to_vec())
                .unwrap_or_default()
        })
    }
}

impl Drop for TrackingContext {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            let popped = frames.borrow_mut().pop();

            // Catch mismatched enter/exit pairs early in debug builds.
            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.subscriber_id, self.subscriber_id,
                    "tracking frame mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, frame.subscriber_id
                );
            }
        });
    }
}
