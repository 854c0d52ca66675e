use crate::frame::Frame;

/// An event stamped with the frame it was emitted in.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    /// `None` when emitted outside the render loop (e.g. during bootstrap).
    pub frame: Option<Frame>,
    pub payload: T,
}

/// Ordered, append-only queue of events drained by the host.
///
/// Events are never merged or deduplicated: every `emit` shows up exactly
/// once in the next `drain`.
#[derive(Debug)]
pub struct EventBus<T> {
    events: Vec<Event<T>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, frame: Option<Frame>, payload: T) {
        self.events.push(Event {
            frame,
            payload,
        });
    }

    pub fn events(&self) -> &[Event<T>] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event<T>> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;
    use crate::frame::FrameClock;

    #[test]
    fn records_events_with_their_frame() {
        let mut clock = FrameClock::new(0.1);
        clock.tick();
        let frame = clock.tick();

        let mut bus = EventBus::new();
        bus.emit(Some(frame), "hello");
        bus.emit(None, "bootstrap");
        assert_eq!(bus.len(), 2);
        assert_eq!(bus.events()[0].frame.map(|f| f.index), Some(1));
        assert_eq!(bus.events()[0].frame.map(|f| f.time_s), Some(0.1));
        assert_eq!(bus.events()[1].frame, None);
    }

    #[test]
    fn identical_payloads_are_kept_apart() {
        let mut bus = EventBus::new();
        bus.emit(None, "same");
        bus.emit(None, "same");
        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert!(bus.is_empty());
    }
}
