//! Capture everything a stream emits, for inspection in tests.

use crate::dataflow::DeltaStream;
use crate::graph::Message;
use crate::multiset::{Data, Multiset};
use crate::operators::inspect::OutputHandle;
use crate::order::{Antichain, Version};
use std::sync::{Arc, Mutex};

/// A recording sink on a stream: every message the stream forwards is stored
/// for later inspection.
///
/// Obtained from [`DeltaStreamTestExt::capture`].
pub struct CapturedOutput<T> {
    messages: Arc<Mutex<Vec<Message<T>>>>,
    handle: OutputHandle,
}

impl<T: Data> CapturedOutput<T> {
    /// All recorded messages, in arrival order.
    pub fn messages(&self) -> Vec<Message<T>> {
        self.messages.lock().unwrap().clone()
    }

    /// The recorded data messages as `(version, collection)` pairs.
    pub fn data(&self) -> Vec<(Version, Multiset<T>)> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                Message::Data { version, collection } => Some((version, collection)),
                Message::Frontier(_) => None,
            })
            .collect()
    }

    /// Take the recorded data messages, clearing the record — convenient for
    /// asserting on one round of emissions at a time.
    pub fn take_data(&self) -> Vec<(Version, Multiset<T>)> {
        let drained: Vec<Message<T>> = self.messages.lock().unwrap().drain(..).collect();
        drained
            .into_iter()
            .filter_map(|message| match message {
                Message::Data { version, collection } => Some((version, collection)),
                Message::Frontier(_) => None,
            })
            .collect()
    }

    /// The canonical sum of every recorded delta: the accumulated
    /// collection.
    pub fn accumulated(&self) -> Multiset<T> {
        let mut total = Multiset::new();
        for (_, collection) in self.data() {
            total.extend(collection.into_entries());
        }
        total.consolidate()
    }

    /// The frontiers observed so far, in arrival order.
    pub fn frontiers(&self) -> Vec<Antichain> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                Message::Frontier(frontier) => Some(frontier),
                Message::Data { .. } => None,
            })
            .collect()
    }

    /// The probe on the stream's frontier.
    pub fn probe(&self) -> &OutputHandle {
        &self.handle
    }
}

/// Test-side extensions on [`DeltaStream`].
pub trait DeltaStreamTestExt<T> {
    /// Attach a recording sink to the stream.
    fn capture(&self) -> CapturedOutput<T>;
}

impl<T: Data> DeltaStreamTestExt<T> for DeltaStream<T> {
    fn capture(&self) -> CapturedOutput<T> {
        let messages: Arc<Mutex<Vec<Message<T>>>> = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&messages);
        let handle = self.output(move |message| store.lock().unwrap().push(message));
        CapturedOutput { messages, handle }
    }
}
