use serde::{Deserialize, Serialize};

use crate::observers::{ObserverHandle, ObserverSet};

/// One edited region of a document change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    /// Text inserted in place of the region (empty for a pure deletion).
    pub text: String,
}

impl ContentChange {
    /// Length in UTF-16 code units, the unit editor hosts report.
    pub fn inserted_len(&self) -> usize {
        self.text.encode_utf16().count()
    }
}

/// A document-change notification from the editor host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChange {
    pub document: String,
    pub changes: Vec<ContentChange>,
    /// Number of selection regions in the active editor when the change happened.
    pub selections: usize,
    /// Whether the change belongs to the document shown in the active editor.
    #[serde(default = "default_true")]
    pub in_active_editor: bool,
}

fn default_true() -> bool {
    true
}

/// Editor activity the recorder listens to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "camelCase")]
pub enum EditorSignal {
    DocumentChanged(DocumentChange),
    FocusChanged { focused: bool },
}

/// Fan-out of editor signals to whoever is listening.
#[derive(Default)]
pub struct SignalBus {
    listeners: ObserverSet<EditorSignal>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> ObserverHandle
    where
        F: Fn(&EditorSignal) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, handle: ObserverHandle) -> bool {
        self.listeners.unsubscribe(handle)
    }

    pub fn publish(&self, signal: &EditorSignal) {
        self.listeners.notify(signal);
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
