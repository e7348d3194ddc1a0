//! Mock serial port implementation for testing
//!
//! This module provides an in-memory serial port that can stand in for the
//! microcontroller. Replies can be queued up front, or scripted so that they
//! only appear once the matching command line has been written, which is how
//! the real device behaves. A scripted reply may also be held back for a
//! while after the write, measured on the tokio clock.

use crate::link::serial::SerialLink;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Instant;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock serial port that simulates bidirectional communication
#[derive(Clone, Default)]
pub struct MockSerialPort {
    /// Data written to the port (outgoing)
    pub tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Data to be read from the port (incoming)
    pub rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Simulated error for the next read or write
    pub next_error: Arc<Mutex<Option<io::Error>>>,
    /// Replies keyed by the command line that triggers them, with their delay
    scripted: Arc<Mutex<HashMap<String, (Duration, Vec<u8>)>>>,
    /// Triggered replies waiting for their release time
    delayed: Arc<Mutex<Vec<(Instant, Vec<u8>)>>>,
    /// Written bytes not yet terminated by a newline
    pending_line: Arc<Mutex<Vec<u8>>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue data to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        lock(&self.rx_buffer).extend(data);
    }

    /// Queue reply lines, each terminated with `\r\n` like Arduino `println`
    pub fn queue_lines(&self, lines: &[&str]) {
        self.queue_rx_data(&crlf_lines(lines));
    }

    /// Reply with `lines` whenever `command` is written as a full line
    pub fn script_reply(&self, command: &str, lines: &[&str]) {
        self.script_reply_after(command, lines, Duration::ZERO);
    }

    /// Like `script_reply`, but the reply only becomes readable `delay`
    /// after the command was written
    pub fn script_reply_after(&self, command: &str, lines: &[&str], delay: Duration) {
        lock(&self.scripted).insert(command.to_string(), (delay, crlf_lines(lines)));
    }

    /// Reply with raw bytes whenever `command` is written as a full line
    pub fn script_reply_bytes(&self, command: &str, bytes: &[u8]) {
        lock(&self.scripted).insert(command.to_string(), (Duration::ZERO, bytes.to_vec()));
    }

    /// Get data that was written to the port
    pub fn get_tx_data(&self) -> Vec<u8> {
        lock(&self.tx_buffer).clone()
    }

    /// Get the written data split into lines, terminators removed
    pub fn sent_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.get_tx_data())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Clear all buffers
    pub fn clear(&self) {
        lock(&self.tx_buffer).clear();
        lock(&self.rx_buffer).clear();
        lock(&self.pending_line).clear();
        lock(&self.delayed).clear();
    }

    /// Set an error to be returned on the next operation
    pub fn set_next_error(&self, error: io::Error) {
        *lock(&self.next_error) = Some(error);
    }

    fn take_error(&self) -> Option<io::Error> {
        lock(&self.next_error).take()
    }

    fn on_written(&self, buf: &[u8]) {
        lock(&self.tx_buffer).extend_from_slice(buf);

        let mut pending = lock(&self.pending_line);
        pending.extend_from_slice(buf);
        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = pending.drain(..=pos).collect();
            let command = String::from_utf8_lossy(&line[..pos]).trim_end().to_string();
            if let Some((delay, reply)) = lock(&self.scripted).get(&command) {
                if delay.is_zero() {
                    lock(&self.rx_buffer).extend(reply.iter().copied());
                } else {
                    lock(&self.delayed).push((Instant::now() + *delay, reply.clone()));
                }
            }
        }
    }

    /// Moves delayed replies whose time has come into the receive buffer.
    fn release_due(&self) {
        let now = Instant::now();
        let mut delayed = lock(&self.delayed);
        let mut rx = lock(&self.rx_buffer);
        delayed.retain(|(at, reply)| {
            if *at <= now {
                rx.extend(reply.iter().copied());
                false
            } else {
                true
            }
        });
    }
}

fn crlf_lines(lines: &[&str]) -> Vec<u8> {
    lines
        .iter()
        .flat_map(|line| line.bytes().chain(*b"\r\n"))
        .collect()
}

#[async_trait::async_trait]
impl SerialLink for MockSerialPort {
    fn bytes_pending(&self) -> io::Result<usize> {
        self.release_due();
        Ok(lock(&self.rx_buffer).len())
    }

    fn discard_input(&self) -> io::Result<()> {
        lock(&self.rx_buffer).clear();
        Ok(())
    }
}

// An empty receive buffer reads as end of stream.
impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.take_error() {
            return Poll::Ready(Err(error));
        }

        self.release_due();
        let mut rx = lock(&self.rx_buffer);
        let available = rx.len().min(buf.remaining());

        if available > 0 {
            let data: Vec<u8> = rx.drain(..available).collect();
            buf.put_slice(&data);
        }

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = self.take_error() {
            return Poll::Ready(Err(error));
        }

        self.on_written(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_mock_serial_port_creation() {
        let port = MockSerialPort::new();
        assert_eq!(port.get_tx_data().len(), 0);
        assert_eq!(port.bytes_pending().unwrap(), 0);
    }

    #[test]
    fn test_queue_lines_uses_crlf() {
        let port = MockSerialPort::new();
        port.queue_lines(&["a", "bc"]);

        let rx = lock(&port.rx_buffer);
        assert_eq!(rx.iter().copied().collect::<Vec<u8>>(), b"a\r\nbc\r\n".to_vec());
    }

    #[tokio::test]
    async fn test_scripted_reply_appears_after_full_line() {
        let mut port = MockSerialPort::new();
        port.script_reply("ping", &["pong"]);

        port.write_all(b"pi").await.unwrap();
        assert_eq!(port.bytes_pending().unwrap(), 0);
        port.write_all(b"ng\n").await.unwrap();
        assert_eq!(port.bytes_pending().unwrap(), 6);

        let mut buf = [0u8; 6];
        port.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong\r\n");
    }

    #[tokio::test]
    async fn test_unscripted_command_gets_no_reply() {
        let mut port = MockSerialPort::new();
        port.script_reply("ping", &["pong"]);
        port.write_all(b"other\n").await.unwrap();
        assert_eq!(port.bytes_pending().unwrap(), 0);
        assert_eq!(port.sent_lines(), vec!["other".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply_released_on_time() {
        let mut port = MockSerialPort::new();
        port.script_reply_after("ping", &["pong"], Duration::from_millis(300));

        port.write_all(b"ping\n").await.unwrap();
        assert_eq!(port.bytes_pending().unwrap(), 0);

        tokio::time::advance(Duration::from_millis(299)).await;
        assert_eq!(port.bytes_pending().unwrap(), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(port.bytes_pending().unwrap(), 6);
    }

    #[test]
    fn test_clear_buffers() {
        let port = MockSerialPort::new();
        port.queue_rx_data(&[1, 2, 3]);
        port.clear();

        assert!(lock(&port.rx_buffer).is_empty());
        assert!(port.get_tx_data().is_empty());
    }
}
