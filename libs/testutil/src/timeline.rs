use std::sync::{Arc, Mutex};

/// Ordered log of calls shared between doubles.
#[derive(Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<String>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events
            .lock()
            .expect("lock timeline")
            .push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("lock timeline").clone()
    }

    /// Index of the first event equal to `event`.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events
            .lock()
            .expect("lock timeline")
            .iter()
            .position(|recorded| recorded == event)
    }
}
