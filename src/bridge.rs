use std::{
    io,
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use tracing::{debug, info, warn};
use tungstenite::{Error as WsError, Message};

use crate::app::SharedFeed;
use crate::ingest;

const ACCEPT_POLL: Duration = Duration::from_millis(50);
const READ_TIMEOUT: Duration = Duration::from_millis(500);

// The counterpart of the injected shim on the native side: a WebSocket
// listener whose text frames are handed to the ingestion adapter. One accept
// thread per bridge, one thread per connection.
pub struct BridgeHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// Bind a listener and start the background accept loop.
pub fn spawn(addr: &str, feed: Arc<Mutex<SharedFeed>>) -> anyhow::Result<BridgeHandle> {
    let listener =
        TcpListener::bind(addr).with_context(|| format!("failed to bind bridge on {addr}"))?;
    let local_addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    let accept_thread = thread::spawn(move || accept_loop(&listener, &feed, &flag));

    info!(%local_addr, "bridge listening");
    Ok(BridgeHandle {
        local_addr,
        shutdown,
        accept_thread: Some(accept_thread),
    })
}

fn accept_loop(listener: &TcpListener, feed: &Arc<Mutex<SharedFeed>>, shutdown: &Arc<AtomicBool>) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                let feed = Arc::clone(feed);
                let flag = Arc::clone(shutdown);
                thread::spawn(move || {
                    if let Err(err) = serve_connection(stream, peer, &feed, &flag) {
                        debug!(%peer, error = %err, "bridge connection ended");
                    }
                });
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(err) => {
                warn!(error = %err, "bridge accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    feed: &Mutex<SharedFeed>,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    stream.set_nonblocking(false)?;
    let mut ws =
        tungstenite::accept(stream).map_err(|err| anyhow!("websocket handshake failed: {err}"))?;
    // Short read timeout so the thread notices shutdown promptly.
    ws.get_ref().set_read_timeout(Some(READ_TIMEOUT))?;
    info!(%peer, "bridge connection open");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            let _ = ws.close(None);
            return Ok(());
        }
        match ws.read() {
            Ok(Message::Text(raw)) => ingest::ingest_text(feed, &raw, Instant::now()),
            Ok(Message::Close(_)) => {
                info!(%peer, "bridge connection closed by peer");
                return Ok(());
            }
            // Binary frames carry no JSON text; control frames are handled
            // by the library.
            Ok(_) => {}
            Err(WsError::Io(err))
                if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
    }
}

/// The script to inject into the hosted content. It mirrors every
/// `postMessage` call and every `message` event on the page's global scope
/// to the bridge as a JSON-stringified text frame.
pub fn shim_script(addr: &SocketAddr) -> String {
    format!(
        r#"(function() {{
  var channel = new WebSocket('ws://{addr}');
  function forward(data) {{
    if (channel.readyState === 1) {{
      channel.send(JSON.stringify(data));
    }}
  }}
  window.addEventListener('message', function(event) {{
    forward(event.data);
  }});
  var originalPostMessage = window.postMessage;
  window.postMessage = function(message) {{
    forward(message);
    return originalPostMessage.apply(window, arguments);
  }};
}})();"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn text_frames_reach_the_feed() {
        let feed = Arc::new(Mutex::new(SharedFeed::new(Instant::now())));
        let mut handle = spawn("127.0.0.1:0", Arc::clone(&feed)).unwrap();

        let url = format!("ws://{}", handle.local_addr());
        let (mut client, _) = tungstenite::connect(url.as_str()).unwrap();
        client
            .send(Message::Text(r#"{"hello": "world"}"#.to_string()))
            .unwrap();

        assert!(wait_for(|| feed.lock().unwrap().accepted_total == 1));
        assert_eq!(
            feed.lock().unwrap().last_message,
            Some(json!({"hello": "world"}))
        );

        let _ = client.close(None);
        handle.stop();
    }

    #[test]
    fn malformed_frames_only_bump_the_error_tally() {
        let feed = Arc::new(Mutex::new(SharedFeed::new(Instant::now())));
        let mut handle = spawn("127.0.0.1:0", Arc::clone(&feed)).unwrap();

        let url = format!("ws://{}", handle.local_addr());
        let (mut client, _) = tungstenite::connect(url.as_str()).unwrap();
        client
            .send(Message::Text("{not json".to_string()))
            .unwrap();

        assert!(wait_for(|| feed.lock().unwrap().parse_errors == 1));
        let snapshot = feed.lock().unwrap();
        assert_eq!(snapshot.last_message, None);
        assert_eq!(snapshot.accepted_total, 0);
        drop(snapshot);

        let _ = client.close(None);
        handle.stop();
    }

    #[test]
    fn stop_rebinds_cleanly_on_the_same_port() {
        let feed = Arc::new(Mutex::new(SharedFeed::new(Instant::now())));
        let mut handle = spawn("127.0.0.1:0", Arc::clone(&feed)).unwrap();
        let addr = handle.local_addr();
        handle.stop();

        // The port is free again once the accept thread has joined.
        let mut replacement = spawn(&addr.to_string(), feed).unwrap();
        assert_eq!(replacement.local_addr(), addr);
        replacement.stop();
    }

    #[test]
    fn shim_targets_the_bridge_address() {
        let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let script = shim_script(&addr);
        assert!(script.contains("ws://127.0.0.1:9001"));
        assert!(script.contains("window.postMessage"));
        assert!(script.contains("addEventListener('message'"));
    }
}
