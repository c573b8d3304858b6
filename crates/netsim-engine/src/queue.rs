//! Event and timer min-heaps (component C). Both wrap `BinaryHeap`, which is
//! a max-heap in std, by reversing the `Ord` implementation so the earliest
//! timestamp pops first — the same trick the teacher's `tcp-lab-simulator`
//! engine uses for its single event heap.

use std::cmp::Ordering;

/// A pending frame delivery, queued until its computed arrival time.
#[derive(Debug)]
pub struct FrameDeliveryEntry {
    pub time: u64,
    /// Insertion order, used to break ties (§4.C: "FrameDelivery entries
    /// with equal timestamps are deemed equal for ordering" — stable by
    /// insertion sequence).
    pub seq: u64,
    pub frame: Vec<u8>,
    pub link_id: usize,
    pub receivers: Vec<usize>,
}

impl PartialEq for FrameDeliveryEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for FrameDeliveryEntry {}

impl PartialOrd for FrameDeliveryEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrameDeliveryEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A heap slot for a timer; the live payload (node, slot, data) lives in the
/// simulator's `timer_map` keyed by `timer_id`, not here — this is just
/// enough to know when to look it up (§4.C: ordered by `(fire_time, id)`).
#[derive(Debug, Eq, PartialEq)]
pub struct TimerEntry {
    pub time: u64,
    pub timer_id: u64,
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.timer_id.cmp(&self.timer_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn event_heap_breaks_ties_by_insertion_order() {
        let mut heap = BinaryHeap::new();
        heap.push(FrameDeliveryEntry {
            time: 100,
            seq: 0,
            frame: vec![1],
            link_id: 0,
            receivers: vec![0],
        });
        heap.push(FrameDeliveryEntry {
            time: 100,
            seq: 1,
            frame: vec![2],
            link_id: 0,
            receivers: vec![0],
        });
        heap.push(FrameDeliveryEntry {
            time: 50,
            seq: 2,
            frame: vec![3],
            link_id: 0,
            receivers: vec![0],
        });

        assert_eq!(heap.pop().unwrap().frame, vec![3]);
        assert_eq!(heap.pop().unwrap().frame, vec![1]);
        assert_eq!(heap.pop().unwrap().frame, vec![2]);
    }

    #[test]
    fn timer_heap_breaks_ties_by_id() {
        let mut heap = BinaryHeap::new();
        heap.push(TimerEntry { time: 10, timer_id: 5 });
        heap.push(TimerEntry { time: 10, timer_id: 2 });
        heap.push(TimerEntry { time: 5, timer_id: 9 });

        assert_eq!(heap.pop().unwrap().timer_id, 9);
        assert_eq!(heap.pop().unwrap().timer_id, 2);
        assert_eq!(heap.pop().unwrap().timer_id, 5);
    }
}
