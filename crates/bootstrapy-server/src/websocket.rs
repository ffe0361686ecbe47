//! Live reload over WebSocket.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Path of the websocket endpoint.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Path the client script is served from.
pub const LIVERELOAD_SCRIPT_PATH: &str = "/__livereload.js";

/// Messages pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,
}

/// Hub broadcasting reload messages to every connected browser.
#[derive(Debug, Clone)]
pub struct LiveReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl LiveReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers just means no browser is open
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Number of connected sessions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side script that reloads the page on `reload`.
///
/// The socket URL follows the page's own host, so the script works on any
/// port the server ends up bound to.
pub fn livereload_client_script() -> String {
    format!(
        r#"(function() {{
  'use strict';

  var protocol = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var attempts = 0;

  function connect() {{
    var ws = new WebSocket(protocol + location.host + '{path}');

    ws.onopen = function() {{
      attempts = 0;
    }};

    ws.onmessage = function(event) {{
      var msg = JSON.parse(event.data);
      if (msg.type === 'reload') {{
        location.reload();
      }} else if (msg.type === 'connected') {{
        console.log('[livereload] connected');
      }}
    }};

    ws.onclose = function() {{
      if (attempts < 10) {{
        attempts++;
        setTimeout(connect, 1000 * attempts);
      }}
    }};
  }}

  connect();
}})();
"#,
        path = LIVERELOAD_PATH
    )
}
