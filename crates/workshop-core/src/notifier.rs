//! Change notifications for downstream libraries.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Host-side avatar library that re-reads `avatars.json` on demand.
pub trait AvatarLibrary: Send + Sync {
    fn reload_avatars(&self);
}

/// Host-side mod loader that rescans the mods folder on demand.
pub trait ModLoader: Send + Sync {
    fn rescan_mods(&self);
}

/// Fan-out of pass results to registered listeners.
#[derive(Clone, Default)]
pub struct Notifier {
    avatar_libraries: Vec<Arc<dyn AvatarLibrary>>,
    mod_loaders: Vec<Arc<dyn ModLoader>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_avatar_library(&mut self, library: Arc<dyn AvatarLibrary>) {
        self.avatar_libraries.push(library);
    }

    pub fn add_mod_loader(&mut self, loader: Arc<dyn ModLoader>) {
        self.mod_loaders.push(loader);
    }

    pub fn listener_count(&self) -> usize {
        self.avatar_libraries.len() + self.mod_loaders.len()
    }

    /// Tell listeners which sets changed.
    ///
    /// Delivery happens on a new task that first yields to the scheduler, so
    /// listeners never run inside the step that mutated the store. Returns
    /// `None` if there is nothing to deliver.
    pub fn publish(
        &self,
        handle: &Handle,
        avatars_changed: bool,
        mods_changed: bool,
    ) -> Option<JoinHandle<()>> {
        let libraries = if avatars_changed {
            self.avatar_libraries.clone()
        } else {
            Vec::new()
        };
        let loaders = if mods_changed {
            self.mod_loaders.clone()
        } else {
            Vec::new()
        };
        if libraries.is_empty() && loaders.is_empty() {
            return None;
        }

        Some(handle.spawn(async move {
            tokio::task::yield_now().await;

            for library in &libraries {
                deliver("avatar library", || library.reload_avatars());
            }
            for loader in &loaders {
                deliver("mod loader", || loader.rescan_mods());
            }
            debug!(
                "Notified {} avatar libraries and {} mod loaders",
                libraries.len(),
                loaders.len()
            );
        }))
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("avatar_libraries", &self.avatar_libraries.len())
            .field("mod_loaders", &self.mod_loaders.len())
            .finish()
    }
}

/// Run one listener callback; a panic is logged and contained.
fn deliver(listener: &str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        warn!("A {} panicked while handling a change notification", listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl AvatarLibrary for Counter {
        fn reload_avatars(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ModLoader for Counter {
        fn rescan_mods(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panics;

    impl ModLoader for Panics {
        fn rescan_mods(&self) {
            panic!("loader exploded");
        }
    }

    #[tokio::test]
    async fn test_only_changed_sets_are_notified() {
        let library = Arc::new(Counter::default());
        let loader = Arc::new(Counter::default());
        let mut notifier = Notifier::new();
        notifier.add_avatar_library(library.clone());
        notifier.add_mod_loader(loader.clone());

        let task = notifier.publish(&Handle::current(), false, true).unwrap();
        task.await.unwrap();

        assert_eq!(library.0.load(Ordering::SeqCst), 0);
        assert_eq!(loader.0.load(Ordering::SeqCst), 1);
        assert!(notifier.publish(&Handle::current(), false, false).is_none());
    }

    #[tokio::test]
    async fn test_delivery_is_deferred() {
        let library = Arc::new(Counter::default());
        let mut notifier = Notifier::new();
        notifier.add_avatar_library(library.clone());

        let task = notifier.publish(&Handle::current(), true, false).unwrap();
        assert_eq!(library.0.load(Ordering::SeqCst), 0);
        task.await.unwrap();
        assert_eq!(library.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_stop_others() {
        let loader = Arc::new(Counter::default());
        let mut notifier = Notifier::new();
        notifier.add_mod_loader(Arc::new(Panics));
        notifier.add_mod_loader(loader.clone());

        let task = notifier.publish(&Handle::current(), false, true).unwrap();
        assert!(task.await.is_ok());
        assert_eq!(loader.0.load(Ordering::SeqCst), 1);
    }
}
