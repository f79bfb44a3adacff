use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;

/// Raw newline-delimited JSON-over-TCP transport: one thread per
/// connection, each request line dispatched and replied to with a single
/// JSON line. Mirrors the original implementation's `SocketServer`.
pub struct SocketTransport {
    listener: TcpListener,
}

impl SocketTransport {
    pub fn bind(host: &str, port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind((host, port))?;
        info!(host, port, "socket transport listening");
        Ok(Self { listener })
    }

    /// Accepts connections until the listener is closed or an unrecoverable
    /// accept error occurs. Intended to run on its own thread.
    pub fn serve(self, dispatcher: Arc<Dispatcher>) {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let dispatcher = dispatcher.clone();
                    thread::spawn(move || handle_connection(stream, dispatcher));
                }
                Err(err) => {
                    warn!(error = %err, "error accepting socket connection");
                }
            }
        }
    }
}

fn handle_connection(stream: TcpStream, dispatcher: Arc<Dispatcher>) {
    let peer = stream.peer_addr().ok();
    let reader = BufReader::new(stream.try_clone().expect("clone tcp stream"));
    let mut writer = stream;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                debug!(?peer, error = %err, "connection read error");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        debug!(?peer, request = %line, "received request");
        let reply = dispatcher.handle_line(&line);
        let mut payload = reply.to_json_line();
        payload.push('\n');

        if let Err(err) = writer.write_all(payload.as_bytes()) {
            error!(?peer, error = %err, "error writing reply");
            return;
        }
    }
}
