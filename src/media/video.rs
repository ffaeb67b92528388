use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::broadcast::{self, Receiver, Sender};

/// A playable video element as seen by the registry.
pub trait VideoHandle: Send + Sync {
    fn id(&self) -> &str;
    fn play(&self);
    fn pause(&self);
    fn seek_to_start(&self);
    fn is_playing(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VideoEvent {
    Activated { id: String },
    Deactivated { id: String },
    Cleared,
}

/// Keeps at most one video playing across every feed on screen.
pub struct VideoRegistry {
    active: Mutex<Option<Arc<dyn VideoHandle>>>,
    sender: Sender<VideoEvent>,
}

impl VideoRegistry {
    pub fn new() -> Self {
        const EVENT_BUFFER_SIZE: usize = 64;

        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            active: Mutex::new(None),
            sender,
        }
    }

    /// Makes `handle` the only playing video. The previous one is paused and rewound.
    ///
    /// Handles are driven outside the lock, so a handle may call back into the registry.
    pub fn activate(&self, handle: Arc<dyn VideoHandle>) {
        let id = handle.id().to_string();
        let previous = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(Arc::clone(&handle));

        if let Some(previous) = previous.filter(|previous| previous.id() != id) {
            tracing::trace!(previous = previous.id(), next = %id, "Switching video");
            previous.pause();
            previous.seek_to_start();
        }

        handle.play();
        let _ = self.sender.send(VideoEvent::Activated { id });
    }

    /// Pauses and forgets `id` when it is the active video. Returns whether anything changed.
    pub fn deactivate(&self, id: &str) -> bool {
        let current = {
            let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match active.take() {
                Some(current) if current.id() == id => current,
                other => {
                    *active = other;
                    return false;
                }
            }
        };

        current.pause();
        let _ = self.sender.send(VideoEvent::Deactivated { id: id.to_string() });
        true
    }

    pub fn active_id(&self) -> Option<String> {
        self.active
            .lock()
            .ok()
            .and_then(|active| active.as_ref().map(|handle| handle.id().to_string()))
    }

    pub fn subscribe(&self) -> Receiver<VideoEvent> {
        self.sender.subscribe()
    }

    /// Pauses whatever is playing and forgets it. Called when the session ends.
    pub fn reset(&self) {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(previous) = previous {
            previous.pause();
        }
        let _ = self.sender.send(VideoEvent::Cleared);
    }
}

impl Default for VideoRegistry {
    fn default() -> Self {
        Self::new()
    }
}
