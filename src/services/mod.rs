pub mod watcher;

pub use watcher::{DebounceWatcher, WatchError, WatchState, WatcherConfig};
