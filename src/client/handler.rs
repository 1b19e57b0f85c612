//! Session command loop.
//!
//! Reads a command, dispatches it, writes its reply, and repeats until QUIT,
//! end of stream, a fatal control fault or server shutdown.

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::client::control_channel::ControlEvent;
use crate::client::state::{Flow, Session};
use crate::error::handlers::session_error_reply;
use crate::protocol::{Reply, ReplyKind};

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Serves the session until it ends, then releases its connections.
    pub async fn run(mut self) {
        info!("Session {} started", self.label());

        if let Err(e) = self.control.write_reply(&Reply::of(ReplyKind::ServiceReady)).await {
            error!("Session {} failed to send greeting: {}", self.label(), e);
            self.release().await;
            return;
        }

        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Session {} closing for server shutdown", self.label());
                    break;
                }
                event = self.control.read_command() => event,
            };

            let command = match event {
                Ok(ControlEvent::Command(command)) => command,
                Ok(ControlEvent::Closed) => {
                    debug!("Session {} reached end of stream", self.label());
                    let _ = self.control.write_reply(&Reply::of(ReplyKind::Goodbye)).await;
                    break;
                }
                Ok(ControlEvent::LineTooLong(length)) => {
                    warn!(
                        "Session {} sent a {} byte command line",
                        self.label(),
                        length
                    );
                    match self.reply(Reply::of(ReplyKind::CommandTooLong)).await {
                        Ok(()) => continue,
                        Err(e) => {
                            error!("Session {} control write failed: {}", self.label(), e);
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!("Session {} control read failed: {}", self.label(), e);
                    let _ = self.control.write_reply(&Reply::of(ReplyKind::FatalError)).await;
                    break;
                }
            };

            match self.dispatch(&command).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => {
                    info!("Session {} requested to quit", self.label());
                    break;
                }
                Err(e) if !e.is_fatal() => {
                    debug!("Session {} rejected {}: {}", self.label(), command, e);
                    if let Err(e) = self.reply(session_error_reply(&e)).await {
                        error!("Session {} control write failed: {}", self.label(), e);
                        break;
                    }
                }
                Err(e) => {
                    error!("Session {} aborted: {}", self.label(), e);
                    let _ = self.control.write_reply(&session_error_reply(&e)).await;
                    break;
                }
            }
        }

        self.release().await;
    }

    /// Closes the data channel, if open, and the control connection.
    async fn release(&mut self) {
        self.abort_transfer();
        if let Err(e) = self.control.shutdown().await {
            debug!("Session {} control shutdown failed: {}", self.label(), e);
        }
        info!("Session {} disconnected", self.label());
    }
}
