// THEORY:
// A fixed-capacity ring of the most recent frames. It never holds more than
// `capacity` items: once full, every push evicts the oldest. Reads are by
// insertion order, index 0 being the oldest item still resident, and reads
// past the fill level return `None` instead of stale slots.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> CircularBuffer<T> {
    /// Returns `None` for a zero capacity.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Inserts `item`, returning the evicted oldest item when the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(CircularBuffer::<u8>::new(0).is_none());
    }

    #[test]
    fn reads_back_in_insertion_order() {
        let mut buffer = CircularBuffer::new(4).unwrap();
        for value in 1..=4 {
            assert_eq!(buffer.push(value), None);
        }
        assert!(buffer.is_full());
        let read: Vec<i32> = (0..4).map(|i| *buffer.get(i).unwrap()).collect();
        assert_eq!(read, vec![1, 2, 3, 4]);
    }

    #[test]
    fn push_when_full_evicts_oldest() {
        let mut buffer = CircularBuffer::new(4).unwrap();
        for value in 1..=4 {
            buffer.push(value);
        }
        assert_eq!(buffer.push(5), Some(1));
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.get(0), Some(&2));
        assert_eq!(buffer.get(3), Some(&5));
    }

    #[test]
    fn wraps_many_times_without_growing() {
        // Ten slots, fourteen pushes: the last ten survive.
        let mut buffer = CircularBuffer::new(10).unwrap();
        for value in 1..=14 {
            buffer.push(value);
        }
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), (5..=14).collect::<Vec<_>>());
    }

    #[test]
    fn reads_past_fill_level_are_none() {
        let mut buffer = CircularBuffer::new(3).unwrap();
        buffer.push('a');
        assert_eq!(buffer.get(1), None);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.get(0), None);
    }
}
