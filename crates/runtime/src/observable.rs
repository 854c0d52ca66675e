/// Identifies a registered subscriber so it can be removed later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

type Subscriber<T> = Box<dyn FnMut(&T, u64) + Send>;

/// Versioned state container with synchronous, ordered notification.
///
/// Every committed change bumps `version` by one and calls each subscriber
/// in registration order before `update` returns, so all subscribers observe
/// version N before any of them observes N + 1. Subscribers only get a shared
/// reference and cannot re-enter the container.
pub struct Observable<T> {
    value: T,
    version: u64,
    next_subscription: u64,
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("version", &self.version)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<T: PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            version: 0,
            next_subscription: 1,
            subscribers: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn subscribe(&mut self, f: impl FnMut(&T, u64) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    /// Returns `true` if the subscriber was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Replace the value with `f(previous)`.
    ///
    /// Returns `true` if the value changed (and subscribers were notified).
    pub fn update(&mut self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.value);
        if next == self.value {
            return false;
        }
        self.value = next;
        self.version += 1;
        for (_, sub) in self.subscribers.iter_mut() {
            sub(&self.value, self.version);
        }
        true
    }
}
