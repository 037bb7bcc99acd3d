//! Double-buffered event stream storage.
//!
//! This module provides [`Stream`], the core storage type for the event system.
//! Each event type gets its own stream with two internal buffers that swap each frame.
//!
//! # Double-Buffer Model
//!
//! The stream maintains two buffers:
//! - **Active buffer**: Where new events are written via [`send()`](Stream::send)
//! - **Stable buffer**: Where events are read via [`iter()`](Stream::iter)
//!
//! When [`swap()`](Stream::swap) is called (typically once per frame):
//! 1. The active buffer becomes the stable buffer (events become readable)
//! 2. The old stable buffer is cleared and becomes the new active buffer
//!
//! This design allows writers and readers to operate on different buffers,
//! enabling parallel access without conflicts.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut stream = Stream::<MyEvent>::new(1024);
//!
//! // Frame N: Write events
//! stream.send(MyEvent { value: 1 });
//! stream.send(MyEvent { value: 2 });
//!
//! // Events not yet readable (in active buffer)
//! assert!(stream.is_empty());
//!
//! // End of frame: swap buffers
//! stream.swap();
//!
//! // Frame N+1: Events now readable
//! for event in stream.iter() {
//!     println!("{:?}", event);
//! }
//! ```

use std::any::Any;

use crate::ecs::event::Event;

/// Double-buffered storage for a single event type.
///
/// `Stream<E>` stores events of type `E` using a double-buffer pattern.
/// Writers append to the active buffer, while readers iterate over the stable buffer.
/// Buffers are swapped by the [`Broker`](super::Broker) at frame boundaries.
///
/// # Capacity
///
/// Each stream has a fixed capacity set at creation. Attempting to send more events
/// than the capacity allows will panic. Choose capacity based on expected event volume:
/// - Input events: 64-256 (bounded by input rate)
/// - Gameplay events: 1024+ (collisions, damage, etc.)
/// - High-frequency events: 4096+ (particles, audio triggers)
///
/// # Thread Safety
///
/// `Stream` itself is not thread-safe. Thread safety is provided by the
/// scheduler's access control system, which ensures that:
/// - Only one system can write to a stream at a time (exclusive access)
/// - Multiple systems can read from a stream simultaneously (shared access)
/// - Writers and readers access different buffers (no conflicts)
pub struct Stream<E: Event> {
    /// Index of the currently active (write) buffer: 0 or 1
    active_index: usize,

    /// The two buffers - one active, one stable
    buffers: [Vec<E>; 2],

    /// Capacity limit - panic on overflow
    capacity: usize,
}

impl<E: Event> Stream<E> {
    /// Creates a new event stream with the specified capacity.
    ///
    /// Both internal buffers are pre-allocated to the given capacity to avoid
    /// allocations during gameplay.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events that can be sent per frame.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// // Create a stream that can hold up to 1024 events per frame
    /// let stream = Stream::<DamageEvent>::new(1024);
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self {
            active_index: 0,
            buffers: [Vec::with_capacity(capacity), Vec::with_capacity(capacity)],
            capacity,
        }
    }

    /// Send an event to the active buffer.
    ///
    /// # Panics
    ///
    /// Panics if the active buffer would exceed capacity.
    pub fn send(&mut self, event: E) {
        assert!(
            self.buffers[self.active_index].len() < self.capacity,
            "Event stream capacity exceeded: {} events (capacity: {})",
            self.buffers[self.active_index].len(),
            self.capacity
        );
        self.buffers[self.active_index].push(event);
    }

    /// Returns an iterator over events in the stable buffer.
    ///
    /// Events are yielded in the order they were sent. This only includes events
    /// sent before the last [`swap()`](Self::swap) call.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// for event in stream.iter() {
    ///     println!("Processing: {:?}", event);
    /// }
    /// ```
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.stable_buffer().iter()
    }

    /// Returns the number of events in the stable buffer.
    ///
    /// This count reflects events available for reading, not events currently
    /// being written to the active buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.stable_buffer().len()
    }

    /// Returns `true` if the stable buffer contains no events.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stable_buffer().is_empty()
    }

    /// Swaps the active and stable buffers.
    ///
    /// After swap:
    /// - Events in the old active buffer become readable via [`iter()`](Self::iter)
    /// - The old stable buffer is cleared and becomes the new active buffer
    ///
    /// This is called by [`Broker::swap_all()`](super::Broker::swap_all)
    /// and should not be called directly.
    pub(crate) fn swap(&mut self) {
        self.active_index = 1 - self.active_index;
        self.buffers[self.active_index].clear();
    }

    /// Returns a reference to the stable (readable) buffer.
    #[inline]
    fn stable_buffer(&self) -> &Vec<E> {
        &self.buffers[1 - self.active_index]
    }
}

/// Type-erased interface for event streams.
///
/// This trait enables [`Broker`](super::Broker) to store heterogeneous
/// `Stream<E>` instances in a single collection while still supporting
/// operations that don't require knowing the concrete event type.
///
/// # Type Erasure Pattern
///
/// The broker stores `Box<dyn ErasedStream>` and uses [`as_any()`](Self::as_any)
/// and [`as_any_mut()`](Self::as_any_mut) to downcast back to the concrete
/// `Stream<E>` when type-specific access is needed.
pub(crate) trait ErasedStream: Send + Sync {
    /// Swaps the active and stable buffers.
    fn swap(&mut self);

    /// Returns the number of events in the stable buffer.
    fn stable_len(&self) -> usize;

    /// Returns a reference to self as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to self as `&mut dyn Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Event> ErasedStream for Stream<E> {
    fn swap(&mut self) {
        Stream::swap(self);
    }

    fn stable_len(&self) -> usize {
        self.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
