//! Development server with live reload for bootstrapy sites.
//!
//! Serves the output tree, watches the sources, rebuilds on change and
//! tells connected browsers to reload.

pub mod server;
pub mod watch_loop;
pub mod watcher;
pub mod websocket;

pub use server::{BoundServer, DevServer, DevServerConfig, ServerError};
pub use watch_loop::{Rebuild, RebuildScheduler, WatchLoop, WatchStats};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{LiveReloadHub, ReloadMessage};
