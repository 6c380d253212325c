//! Transaction event sink
//!
//! Commands raise "relation changing" notifications in their `begin` phase
//! and "relation changed" notifications in their `end` phase. The sink is
//! injected into every end point (and from there into every command) when
//! the end point is created; there is no ambient sink.

use crate::metadata::RelationEndPointId;
use crate::types::ObjectId;
use parking_lot::Mutex;
use std::fmt;

/// Collection-specific change raised around an item mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionChange {
    /// `item` is inserted at `index`
    Insert {
        /// Position of the inserted item
        index: usize,
        /// Inserted object
        item: ObjectId,
    },
    /// `item` is removed from `index`
    Remove {
        /// Position of the removed item when the command was created
        index: usize,
        /// Removed object
        item: ObjectId,
    },
    /// The item at `index` is replaced
    Replace {
        /// Position of the replaced item
        index: usize,
        /// Object leaving the collection
        old_item: ObjectId,
        /// Object entering the collection
        new_item: ObjectId,
    },
    /// The whole content is replaced
    SetItems {
        /// Objects leaving the collection
        removed: Vec<ObjectId>,
        /// Objects entering the collection
        added: Vec<ObjectId>,
    },
}

/// Notification target for relation changes of one transaction
///
/// Thread safety: sinks are shared through `Arc` and must be `Send + Sync`,
/// even though one transaction processes its commands sequentially.
pub trait TransactionEventSink: Send + Sync + fmt::Debug {
    /// Raised before a relation property changes
    fn relation_changing(
        &self,
        owner: &ObjectId,
        end_point: &RelationEndPointId,
        old_related: Option<&ObjectId>,
        new_related: Option<&ObjectId>,
    );

    /// Raised after a relation property changed
    fn relation_changed(
        &self,
        owner: &ObjectId,
        end_point: &RelationEndPointId,
        old_related: Option<&ObjectId>,
        new_related: Option<&ObjectId>,
    );

    /// Raised before a collection end point's items change
    fn collection_changing(&self, _end_point: &RelationEndPointId, _change: &CollectionChange) {}

    /// Raised after a collection end point's items changed
    fn collection_changed(&self, _end_point: &RelationEndPointId, _change: &CollectionChange) {}
}

/// Sink that discards every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl TransactionEventSink for NullEventSink {
    fn relation_changing(
        &self,
        _owner: &ObjectId,
        _end_point: &RelationEndPointId,
        _old_related: Option<&ObjectId>,
        _new_related: Option<&ObjectId>,
    ) {
    }

    fn relation_changed(
        &self,
        _owner: &ObjectId,
        _end_point: &RelationEndPointId,
        _old_related: Option<&ObjectId>,
        _new_related: Option<&ObjectId>,
    ) {
    }
}

/// One notification captured by `RecordingEventSink`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    /// `relation_changing`
    RelationChanging {
        /// Changing end point
        end_point: RelationEndPointId,
        /// Previously related object
        old_related: Option<ObjectId>,
        /// Newly related object
        new_related: Option<ObjectId>,
    },
    /// `relation_changed`
    RelationChanged {
        /// Changed end point
        end_point: RelationEndPointId,
        /// Previously related object
        old_related: Option<ObjectId>,
        /// Newly related object
        new_related: Option<ObjectId>,
    },
    /// `collection_changing`
    CollectionChanging {
        /// Changing collection end point
        end_point: RelationEndPointId,
        /// Item-level change
        change: CollectionChange,
    },
    /// `collection_changed`
    CollectionChanged {
        /// Changed collection end point
        end_point: RelationEndPointId,
        /// Item-level change
        change: CollectionChange,
    },
}

impl RecordedEvent {
    /// True for the "changing" half of a notification pair
    pub fn is_before_change(&self) -> bool {
        matches!(
            self,
            RecordedEvent::RelationChanging { .. } | RecordedEvent::CollectionChanging { .. }
        )
    }
}

/// Sink that records every notification in order
///
/// Used for diagnostics and by the test suites.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventSink {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Only the relation-level events, in order
    pub fn relation_events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    RecordedEvent::RelationChanging { .. } | RecordedEvent::RelationChanged { .. }
                )
            })
            .cloned()
            .collect()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TransactionEventSink for RecordingEventSink {
    fn relation_changing(
        &self,
        _owner: &ObjectId,
        end_point: &RelationEndPointId,
        old_related: Option<&ObjectId>,
        new_related: Option<&ObjectId>,
    ) {
        self.events.lock().push(RecordedEvent::RelationChanging {
            end_point: end_point.clone(),
            old_related: old_related.cloned(),
            new_related: new_related.cloned(),
        });
    }

    fn relation_changed(
        &self,
        _owner: &ObjectId,
        end_point: &RelationEndPointId,
        old_related: Option<&ObjectId>,
        new_related: Option<&ObjectId>,
    ) {
        self.events.lock().push(RecordedEvent::RelationChanged {
            end_point: end_point.clone(),
            old_related: old_related.cloned(),
            new_related: new_related.cloned(),
        });
    }

    fn collection_changing(&self, end_point: &RelationEndPointId, change: &CollectionChange) {
        self.events.lock().push(RecordedEvent::CollectionChanging {
            end_point: end_point.clone(),
            change: change.clone(),
        });
    }

    fn collection_changed(&self, end_point: &RelationEndPointId, change: &CollectionChange) {
        self.events.lock().push(RecordedEvent::CollectionChanged {
            end_point: end_point.clone(),
            change: change.clone(),
        });
    }
}
