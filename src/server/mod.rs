//! TCP server speaking a RESP-compatible command protocol.
//!
//! Each accepted connection gets its own thread running a blocking
//! read-dispatch-reply loop against a shared [`Store`]. The supported
//! commands are `ping`, `quit`, `select`, `set`, `setex`, `get`, `keys`
//! and `del`.

pub mod resp;

use crate::error::{Error, Result};
use crate::Store;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

/// A TCP front-end over a shared store.
pub struct Server {
    listener: TcpListener,
    store: Arc<Store>,
}

impl Server {
    /// Bind the server to `addr`.
    pub fn bind<A: ToSocketAddrs>(addr: A, store: Arc<Store>) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener, store })
    }

    /// The locally bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one handler thread per connection.
    pub fn run(&self) -> Result<()> {
        log::info!("listening on {}", self.listener.local_addr()?);

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let store = Arc::clone(&self.store);
                    std::thread::spawn(move || {
                        let peer = stream
                            .peer_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|_| "unknown".to_string());
                        log::debug!("connection opened: {}", peer);
                        if let Err(e) = handle_connection(stream, &store) {
                            log::warn!("connection {} failed: {}", peer, e);
                        } else {
                            log::debug!("connection closed: {}", peer);
                        }
                    });
                }
                Err(e) => log::warn!("accept failed: {}", e),
            }
        }
        Ok(())
    }
}

/// Serve one connection until the peer disconnects or sends `quit`.
fn handle_connection(stream: TcpStream, store: &Store) -> Result<()> {
    stream.set_nodelay(true)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    loop {
        let args = match resp::read_command(&mut reader) {
            Ok(Some(args)) => args,
            Ok(None) => return Ok(()),
            Err(Error::Io(e)) if is_disconnect(&e) => return Ok(()),
            Err(Error::Protocol(message)) => {
                resp::write_error(&mut writer, &format!("ERR {}", message))?;
                writer.flush()?;
                continue;
            }
            Err(e) => return Err(e),
        };

        if args.is_empty() {
            continue;
        }

        match dispatch(&args, store, &mut writer) {
            Ok(quit) => {
                writer.flush()?;
                if quit {
                    return Ok(());
                }
            }
            Err(Error::Protocol(message)) => {
                resp::write_error(&mut writer, &format!("ERR {}", message))?;
                writer.flush()?;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

/// Execute one command and write its reply. Returns true for `quit`.
fn dispatch<W: Write>(args: &[Vec<u8>], store: &Store, writer: &mut W) -> Result<bool> {
    let command = String::from_utf8_lossy(&args[0]).to_ascii_lowercase();

    match command.as_str() {
        "ping" => resp::write_simple(writer, "PONG")?,
        "quit" => {
            resp::write_simple(writer, "OK")?;
            return Ok(true);
        }
        // Accepted for client compatibility; there is only one keyspace.
        "select" => resp::write_simple(writer, "OK")?,
        "set" => {
            if args.len() != 3 {
                return wrong_args(writer, &command);
            }
            let key = key_arg(&args[1])?;
            match store.set(key, &args[2]) {
                Ok(()) => resp::write_simple(writer, "OK")?,
                Err(e) => resp::write_error(writer, &e.to_string())?,
            }
        }
        "setex" => {
            if args.len() != 4 {
                return wrong_args(writer, &command);
            }
            let key = key_arg(&args[1])?;
            let ttl = String::from_utf8_lossy(&args[2]).parse::<u64>();
            match ttl {
                Ok(secs) => match store.set_ex(key, &args[3], Duration::from_secs(secs)) {
                    Ok(()) => resp::write_simple(writer, "OK")?,
                    Err(e) => resp::write_error(writer, &e.to_string())?,
                },
                Err(_) => resp::write_error(writer, "ERR error parsing ttl")?,
            }
        }
        "get" => {
            if args.len() != 2 {
                return wrong_args(writer, &command);
            }
            let key = key_arg(&args[1])?;
            match store.get(key) {
                Ok(value) => resp::write_bulk(writer, &value)?,
                Err(Error::KeyNotFound) => resp::write_null(writer)?,
                Err(e) => resp::write_error(writer, &e.to_string())?,
            }
        }
        "keys" => {
            if args.len() != 2 {
                return wrong_args(writer, &command);
            }
            // Only the match-everything pattern is supported.
            if args[1] == b"*" {
                let keys = store.keys();
                resp::write_array_header(writer, keys.len())?;
                for key in keys {
                    resp::write_bulk(writer, key.as_bytes())?;
                }
            } else {
                resp::write_array_header(writer, 0)?;
            }
        }
        "del" => {
            if args.len() != 2 {
                return wrong_args(writer, &command);
            }
            let key = key_arg(&args[1])?;
            match store.delete(key) {
                Ok(()) => resp::write_integer(writer, 1)?,
                Err(Error::KeyNotFound) => resp::write_integer(writer, 0)?,
                Err(e) => resp::write_error(writer, &e.to_string())?,
            }
        }
        _ => resp::write_error(writer, &format!("ERR unknown command '{}'", command))?,
    }

    Ok(false)
}

fn key_arg(raw: &[u8]) -> Result<&str> {
    std::str::from_utf8(raw).map_err(|_| Error::protocol("key is not valid UTF-8"))
}

fn wrong_args<W: Write>(writer: &mut W, command: &str) -> Result<bool> {
    resp::write_error(
        writer,
        &format!("ERR wrong number of arguments for '{}' command", command),
    )?;
    Ok(false)
}
