use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

/// One whitespace-delimited unit of input, kept as raw bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token(Vec<u8>);

impl Token {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Substring match on raw bytes; an empty needle always matches
    pub fn contains(&self, needle: &[u8]) -> bool {
        needle.is_empty() || self.0.windows(needle.len()).any(|w| w == needle)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

/// Message sent from the input producer to the scheduler
#[derive(Debug)]
pub enum TokenEvent {
    Token(Token),
    /// The reader hit end-of-stream or an I/O error; nothing follows this
    Failed(io::Error),
}

/// Source of tokens the scheduler waits on
pub trait TokenSource {
    /// Block for up to `timeout` waiting for the next event.
    /// Returns Err(Timeout) if it expires first, Err(Disconnected) if the producer is gone.
    fn recv_timeout(&self, timeout: Duration) -> Result<TokenEvent, RecvTimeoutError>;
}

/// Split one line of input into whitespace-delimited tokens
pub fn split_tokens(line: &[u8]) -> impl Iterator<Item = Token> + '_ {
    line.split(|b| b.is_ascii_whitespace())
        .filter(|chunk| !chunk.is_empty())
        .map(Token::new)
}

const SHUTDOWN_GRACE: Duration = Duration::from_millis(50);

/// Worker thread that reads tokens from a blocking reader and hands them over one
/// at a time through a rendezvous channel.
pub struct InputProducer {
    rx: Receiver<TokenEvent>,
    /// Disconnects when the worker returns or unwinds
    done: Receiver<()>,
    handle: JoinHandle<()>,
}

impl InputProducer {
    pub fn spawn<R>(reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(0);
        let (done_tx, done) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("input-producer".into())
            .spawn(move || {
                let _done = done_tx;
                produce(reader, tx)
            })?;
        Ok(Self { rx, done, handle })
    }

    /// Drop the receiving end and join the worker if it exits within a short grace
    /// period. Returns false when the worker is still blocked in a read and had to be
    /// detached; it exits on its next send or at process end.
    pub fn shutdown(self) -> bool {
        let Self { rx, done, handle } = self;
        drop(rx);

        match done.recv_timeout(SHUTDOWN_GRACE) {
            Err(RecvTimeoutError::Disconnected) => {
                match handle.join() {
                    Ok(()) => debug!("input producer joined"),
                    Err(panic) => debug!(?panic, "input producer panicked"),
                }
                true
            }
            _ => {
                debug!("input producer still blocked on read, detaching");
                false
            }
        }
    }
}

impl TokenSource for InputProducer {
    fn recv_timeout(&self, timeout: Duration) -> Result<TokenEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

fn produce<R: BufRead>(mut reader: R, tx: SyncSender<TokenEvent>) {
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "standard input closed");
                let _ = tx.send(TokenEvent::Failed(eof));
                return;
            }
            Ok(_) => {
                for token in split_tokens(&line) {
                    if tx.send(TokenEvent::Token(token)).is_err() {
                        return;
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(TokenEvent::Failed(e));
                return;
            }
        }
    }
}

/// Test token source fed from a plain channel
pub struct TestTokenSource {
    rx: Receiver<TokenEvent>,
}

impl TestTokenSource {
    pub fn new(rx: Receiver<TokenEvent>) -> Self {
        Self { rx }
    }
}

impl TokenSource for TestTokenSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TokenEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}
