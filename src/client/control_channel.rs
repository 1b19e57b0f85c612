//! Control connection
//!
//! Reads one command line at a time and writes one reply line at a time.
//! Every reply is flushed before the next command is read.

use log::debug;
use std::io;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::protocol::{Command, Reply};

/// What a read from the control connection produced.
#[derive(Debug, PartialEq, Eq)]
pub enum ControlEvent {
    Command(Command),
    /// A line longer than the configured limit, carrying its length
    LineTooLong(usize),
    /// The client closed the connection
    Closed,
}

pub struct ControlChannel<R, W> {
    reader: BufReader<R>,
    writer: W,
    buffer: Vec<u8>,
    max_line_length: usize,
    idle_timeout: Option<Duration>,
}

impl ControlChannel<OwnedReadHalf, OwnedWriteHalf> {
    pub fn from_tcp(
        stream: TcpStream,
        max_line_length: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self::new(read_half, write_half, max_line_length, idle_timeout)
    }
}

impl<R, W> ControlChannel<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        reader: R,
        writer: W,
        max_line_length: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            buffer: Vec::new(),
            max_line_length,
            idle_timeout,
        }
    }

    /// Reads the next command line.
    ///
    /// At most `max_line_length` bytes plus the line terminator are buffered;
    /// the rest of an over-long line is discarded unread. Invalid UTF-8 is
    /// replaced lossily. A read error or an idle timeout is returned as an
    /// I/O error.
    pub async fn read_command(&mut self) -> io::Result<ControlEvent> {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_line())
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "control connection idle"))?,
            None => self.read_line().await,
        }
    }

    async fn read_line(&mut self) -> io::Result<ControlEvent> {
        self.buffer.clear();

        // room for the longest accepted line and its CRLF
        let limit = self.max_line_length as u64 + 2;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buffer)
            .await?;

        if read == 0 {
            return Ok(ControlEvent::Closed);
        }

        if read as u64 == limit && !self.buffer.ends_with(b"\n") {
            let length = self.discard_line().await?;
            return Ok(ControlEvent::LineTooLong(length));
        }

        let line = String::from_utf8_lossy(&self.buffer);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.len() > self.max_line_length {
            return Ok(ControlEvent::LineTooLong(line.len()));
        }

        Ok(ControlEvent::Command(Command::parse(line)))
    }

    /// Skips the remainder of the current line, returning the full line
    /// length without its terminator.
    async fn discard_line(&mut self) -> io::Result<usize> {
        let mut length = self.buffer.len();
        let mut last = self.buffer.last().copied();

        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    if end > 0 {
                        last = Some(available[end - 1]);
                    }
                    length += end;
                    self.reader.consume(end + 1);
                    break;
                }
                None => {
                    let consumed = available.len();
                    last = available.last().copied();
                    length += consumed;
                    self.reader.consume(consumed);
                }
            }
        }

        if last == Some(b'\r') {
            length -= 1;
        }
        Ok(length)
    }

    /// Writes `<code> <message>\n` and flushes it.
    pub async fn write_reply(&mut self, reply: &Reply) -> io::Result<()> {
        debug!("Sending reply: {}", reply);
        let line = format!("{}\n", reply);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }

    /// Flushes and shuts down the write side.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ReplyKind;
    use tokio::io::duplex;

    #[tokio::test]
    async fn reads_commands_until_closed() {
        let (mut client, server) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);
        let mut control = ControlChannel::new(read_half, write_half, 512, None);

        client.write_all(b"USER bob\r\nLIST\n").await.unwrap();
        drop(client);

        assert_eq!(
            control.read_command().await.unwrap(),
            ControlEvent::Command(Command::parse("USER bob"))
        );
        assert_eq!(
            control.read_command().await.unwrap(),
            ControlEvent::Command(Command::parse("LIST"))
        );
        assert_eq!(control.read_command().await.unwrap(), ControlEvent::Closed);
    }

    #[tokio::test]
    async fn long_lines_are_flagged() {
        let (mut client, server) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);
        let mut control = ControlChannel::new(read_half, write_half, 8, None);

        client.write_all(b"CWD a-very-long-directory\nPWD\n").await.unwrap();

        assert_eq!(
            control.read_command().await.unwrap(),
            ControlEvent::LineTooLong(25)
        );
        assert_eq!(
            control.read_command().await.unwrap(),
            ControlEvent::Command(Command::parse("PWD"))
        );
    }

    #[tokio::test]
    async fn huge_lines_are_not_buffered() {
        const LINE: usize = 8 * 1024 * 1024;

        let (mut client, server) = duplex(64 * 1024);
        let (read_half, write_half) = tokio::io::split(server);
        let mut control = ControlChannel::new(read_half, write_half, 512, None);

        let writer = tokio::spawn(async move {
            let chunk = vec![b'a'; 64 * 1024];
            for _ in 0..LINE / chunk.len() {
                client.write_all(&chunk).await.unwrap();
            }
            client.write_all(b"\r\nPWD\n").await.unwrap();
            client
        });

        assert_eq!(
            control.read_command().await.unwrap(),
            ControlEvent::LineTooLong(LINE)
        );
        assert!(control.buffer.capacity() <= 4096);
        assert_eq!(
            control.read_command().await.unwrap(),
            ControlEvent::Command(Command::parse("PWD"))
        );
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn line_at_the_limit_is_accepted() {
        let (mut client, server) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);
        let mut control = ControlChannel::new(read_half, write_half, 8, None);

        client.write_all(b"CWD /tmp\r\nCWD /tmp1\n").await.unwrap();

        assert_eq!(
            control.read_command().await.unwrap(),
            ControlEvent::Command(Command::parse("CWD /tmp"))
        );
        assert_eq!(
            control.read_command().await.unwrap(),
            ControlEvent::LineTooLong(9)
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_not_fatal() {
        let (mut client, server) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);
        let mut control = ControlChannel::new(read_half, write_half, 512, None);

        client.write_all(b"FOO \xff\xfe\n").await.unwrap();
        match control.read_command().await.unwrap() {
            ControlEvent::Command(command) => assert_eq!(command.verb, "FOO"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn replies_are_newline_terminated() {
        let (mut client, server) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);
        let mut control = ControlChannel::new(read_half, write_half, 512, None);

        control.write_reply(&Reply::of(ReplyKind::Goodbye)).await.unwrap();
        control.shutdown().await.unwrap();

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "221 See ya!\n");
    }

    #[tokio::test]
    async fn idle_timeout_is_an_error() {
        let (_client, server) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);
        let mut control =
            ControlChannel::new(read_half, write_half, 512, Some(Duration::from_millis(20)));

        let err = control.read_command().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
