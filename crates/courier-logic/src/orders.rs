//! Order records and the priority release queue.
//!
//! Pending orders wait in a max-heap keyed on priority; equal
//! priorities pop in insertion order so release is deterministic.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// A delivery job. Owned by the release queue while pending, by the
/// active list while on the map, and by exactly one courier inventory
/// while carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub pickup: (i32, i32),
    pub dropoff: (i32, i32),
    pub weight: u32,
    /// Higher = more urgent.
    pub priority: u32,
    pub payout: u64,
    /// Sim timestamp stamped when a courier picks the order up.
    pub picked_up_at: Option<f64>,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        pickup: (i32, i32),
        dropoff: (i32, i32),
        weight: u32,
        priority: u32,
        payout: u64,
    ) -> Self {
        Self {
            id: id.into(),
            pickup,
            dropoff,
            weight,
            priority,
            payout,
            picked_up_at: None,
        }
    }
}

/// Heap entry: max priority first, then earliest insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueuedOrder {
    order: Order,
    seq: u64,
}

impl PartialEq for QueuedOrder {
    fn eq(&self, other: &Self) -> bool {
        self.order.priority == other.order.priority && self.seq == other.seq
    }
}

impl Eq for QueuedOrder {}

impl Ord for QueuedOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order
            .priority
            .cmp(&other.order.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-priority queue of not-yet-released orders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseQueue {
    heap: BinaryHeap<QueuedOrder>,
    next_seq: u64,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending order. O(log n).
    pub fn push(&mut self, order: Order) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedOrder { order, seq });
    }

    /// Remove and return the highest-priority order, or `None` if empty.
    pub fn pop_highest(&mut self) -> Option<Order> {
        self.heap.pop().map(|q| q.order)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Ids of all pending orders, in no particular order.
    pub fn pending_ids(&self) -> Vec<&str> {
        self.heap.iter().map(|q| q.order.id.as_str()).collect()
    }

    /// All pending orders, in no particular order.
    pub fn pending_orders(&self) -> impl Iterator<Item = &Order> {
        self.heap.iter().map(|q| &q.order)
    }
}
