//! Command dispatcher for the Bubble FTP server.
//!
//! Maps each parsed command onto its handler. Every handler writes exactly
//! one final reply; LIST additionally sends a 150 notice before the transfer.
//! Recoverable failures are answered here and never end the session.

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::client::state::{Flow, Session};
use crate::error::handlers::{navigate_error_reply, transfer_error_reply};
use crate::error::{NavigateError, SessionError, TransferError};
use crate::protocol::{Command, Reply, ReplyKind, Verb};
use crate::transfer::DataEndpoint;

const CRLF: &[u8] = b"\r\n";

/// Verbs that touch the filesystem or the data channel
fn needs_login(verb: Verb) -> bool {
    matches!(verb, Verb::Cwd | Verb::Pwd | Verb::Port | Verb::List)
}

/// Shared precondition for verbs that take exactly one argument.
fn single_argument(command: &Command) -> Result<&str, SessionError> {
    match command.args.as_slice() {
        [arg] => Ok(arg.as_str()),
        [] => Err(SessionError::MissingParameter(command.verb.clone())),
        _ => Err(SessionError::TooManyParameters(command.verb.clone())),
    }
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Runs one command to completion.
    ///
    /// Returns `Err` for parameter errors, which the caller answers, and for
    /// control channel faults, which end the session.
    pub async fn dispatch(&mut self, command: &Command) -> Result<Flow, SessionError> {
        let verb = command.kind();
        debug!("Session {} received: {}", self.label(), command);

        let argument = if verb.takes_single_argument() {
            Some(single_argument(command)?)
        } else {
            None
        };

        if self.require_login && needs_login(verb) && !self.auth.is_authenticated() {
            self.reply(Reply::of(ReplyKind::LoginRequired)).await?;
            return Ok(Flow::Continue);
        }

        match (verb, argument) {
            (Verb::Quit, _) => {
                self.reply(Reply::of(ReplyKind::Goodbye)).await?;
                return Ok(Flow::Quit);
            }
            (Verb::User, Some(username)) => self.handle_user(username).await?,
            (Verb::Pass, Some(password)) => self.handle_pass(password).await?,
            (Verb::Syst, _) => self.reply(Reply::of(ReplyKind::SystemType)).await?,
            (Verb::Cwd, Some(target)) => self.handle_cwd(target).await?,
            (Verb::Pwd, _) => self.handle_pwd().await?,
            (Verb::Port, Some(spec)) => self.handle_port(spec).await?,
            (Verb::List, _) => self.handle_list().await?,
            _ => {
                self.reply(Reply::with(ReplyKind::UnknownCommand, command.echo()))
                    .await?
            }
        }

        Ok(Flow::Continue)
    }

    pub(crate) async fn reply(&mut self, reply: Reply) -> Result<(), SessionError> {
        self.control.write_reply(&reply).await?;
        Ok(())
    }

    async fn handle_user(&mut self, username: &str) -> Result<(), SessionError> {
        self.auth.identify(username);
        self.reply(Reply::with(ReplyKind::PasswordRequired, username)).await
    }

    async fn handle_pass(&mut self, password: &str) -> Result<(), SessionError> {
        let Some(username) = self.auth.username().map(str::to_string) else {
            return self.reply(Reply::of(ReplyKind::UsernameFirst)).await;
        };

        if self.auth.verify(password) {
            info!("Session {} authenticated as {}", self.label(), username);
            self.reply(Reply::of(ReplyKind::LoggedIn)).await
        } else {
            warn!("Session {} failed login for {}", self.label(), username);
            self.reply(Reply::with(ReplyKind::LoginFailed, username))
                .await
        }
    }

    async fn handle_cwd(&mut self, target: &str) -> Result<(), SessionError> {
        match self.store.cwd(target) {
            Ok(directory) => {
                debug!("Session {} changed directory to {}", self.label(), directory);
                self.reply(Reply::with(ReplyKind::DirectoryChanged, &directory)).await
            }
            Err(e) => {
                debug!("Session {} CWD {} failed: {}", self.label(), target, e);
                self.reply(navigate_error_reply(&e)).await
            }
        }
    }

    async fn handle_pwd(&mut self) -> Result<(), SessionError> {
        match self.store.pwd() {
            Ok(directory) => {
                self.reply(Reply::with(ReplyKind::WorkingDirectory, &directory))
                    .await
            }
            Err(e) => {
                warn!("Session {} PWD failed: {}", self.label(), e);
                self.reply(navigate_error_reply(&NavigateError::Io(e))).await
            }
        }
    }

    async fn handle_port(&mut self, spec: &str) -> Result<(), SessionError> {
        match spec.parse::<DataEndpoint>() {
            Ok(endpoint) => {
                self.data.configure(endpoint);
                self.reply(Reply::with(ReplyKind::PortOk, spec)).await
            }
            Err(e) => self.reply(transfer_error_reply(&e)).await,
        }
    }

    /// Streams the current directory's entry names over the data channel.
    ///
    /// The data connection is fully written and closed before 226 is sent.
    /// Both the connect and the write give up when the server shuts down.
    async fn handle_list(&mut self) -> Result<(), SessionError> {
        if self.data.endpoint().is_none() {
            return self
                .reply(transfer_error_reply(&TransferError::NotConfigured))
                .await;
        }

        let shutdown = self.shutdown.clone();
        let opened = tokio::select! {
            biased;
            result = self.data.open() => result,
            _ = shutdown.cancelled() => Err(TransferError::Cancelled),
        };
        if let Err(e) = opened {
            warn!("Session {} data connection failed: {}", self.label(), e);
            return self.reply(transfer_error_reply(&e)).await;
        }

        self.reply(Reply::of(ReplyKind::DataConnectionOpen)).await?;

        let entries = match self.store.list() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Session {} failed to list directory: {}", self.label(), e);
                self.abort_transfer();
                return self.reply(Reply::of(ReplyKind::ListingFailed)).await;
            }
        };

        let sent = tokio::select! {
            biased;
            result = self.send_entries(&entries) => result,
            _ = shutdown.cancelled() => Err(TransferError::Cancelled),
        };
        if let Err(e) = sent {
            warn!("Session {} listing transfer failed: {}", self.label(), e);
            self.abort_transfer();
            return self.reply(transfer_error_reply(&e)).await;
        }

        info!(
            "Session {} listed {} entries",
            self.label(),
            entries.len()
        );
        self.reply(Reply::of(ReplyKind::TransferComplete)).await
    }

    async fn send_entries(&mut self, entries: &[String]) -> Result<(), TransferError> {
        for name in entries {
            self.data.write(name.as_bytes()).await?;
            self.data.write(CRLF).await?;
        }
        self.data.close().await
    }

    /// Releases a data connection after a failed transfer.
    ///
    /// Buffered entries are dropped; the peer may not be reading.
    pub(crate) fn abort_transfer(&mut self) {
        if self.data.is_connected() {
            debug!("Session {} releasing data connection", self.label());
        }
        self.data.abandon();
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{
        AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf,
    };
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use crate::auth::{AuthState, Authenticator, StaticCredentials};
    use crate::client::ControlChannel;
    use crate::client::state::{Flow, Session};
    use crate::error::NavigateError;
    use crate::navigate::DirectoryStore;
    use crate::protocol::Command;
    use crate::transfer::DataChannel;

    type TestSession = Session<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    /// In-memory store; `broken` makes PWD fail.
    struct FakeStore {
        current: String,
        entries: Vec<String>,
        broken: bool,
    }

    impl DirectoryStore for FakeStore {
        fn pwd(&self) -> io::Result<String> {
            if self.broken {
                return Err(io::Error::other("disk gone"));
            }
            Ok(self.current.clone())
        }

        fn cwd(&mut self, target: &str) -> Result<String, NavigateError> {
            if target == "/known" {
                self.current = target.to_string();
                Ok(self.current.clone())
            } else {
                Err(NavigateError::NotFound(target.to_string()))
            }
        }

        fn list(&self) -> io::Result<Vec<String>> {
            Ok(self.entries.clone())
        }
    }

    fn new_session(store: FakeStore) -> (BufReader<DuplexStream>, TestSession) {
        let (client, server) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(server);
        let session = Session::new(
            7,
            ControlChannel::new(read_half, write_half, 512, None),
            DataChannel::new(Duration::from_secs(2)),
            Authenticator::new(Arc::new(StaticCredentials::new("u", "p"))),
            Box::new(store),
        );
        (BufReader::new(client), session)
    }

    fn spawn_session(store: FakeStore) -> (BufReader<DuplexStream>, tokio::task::JoinHandle<()>) {
        let (client, session) = new_session(store);
        (client, tokio::spawn(session.run()))
    }

    /// Runs one command directly and returns the first reply line.
    async fn run(
        session: &mut TestSession,
        client: &mut BufReader<DuplexStream>,
        line: &str,
    ) -> String {
        let flow = session.dispatch(&Command::parse(line)).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        read_line(client).await
    }

    fn port_spec(listener: &TcpListener) -> String {
        let port = listener.local_addr().unwrap().port();
        format!("127,0,0,1,{},{}", port >> 8, port & 0xff)
    }

    async fn exchange(client: &mut BufReader<DuplexStream>, command: &str) -> String {
        client
            .get_mut()
            .write_all(format!("{}\n", command).as_bytes())
            .await
            .unwrap();
        read_line(client).await
    }

    async fn read_line(client: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        client.read_line(&mut line).await.unwrap();
        line.trim_end().to_string()
    }

    fn store(entries: &[&str]) -> FakeStore {
        FakeStore {
            current: "/home".into(),
            entries: entries.iter().map(|e| e.to_string()).collect(),
            broken: false,
        }
    }

    #[tokio::test]
    async fn pwd_fault_is_recoverable() {
        let (mut client, session) = spawn_session(FakeStore {
            broken: true,
            ..store(&[])
        });
        assert!(read_line(&mut client).await.starts_with("220"));

        assert_eq!(
            exchange(&mut client, "PWD").await,
            "502 Error retrieving current directory"
        );
        assert_eq!(exchange(&mut client, "QUIT").await, "221 See ya!");
        session.await.unwrap();
    }

    #[tokio::test]
    async fn failed_cwd_keeps_directory() {
        let (mut client, session) = spawn_session(store(&[]));
        read_line(&mut client).await;

        assert_eq!(
            exchange(&mut client, "CWD /elsewhere").await,
            "502 Unknown directory /elsewhere"
        );
        assert_eq!(
            exchange(&mut client, "PWD").await,
            "257 /home is the current working directory."
        );
        assert_eq!(
            exchange(&mut client, "CWD /known").await,
            "250 OK. New directory is /known"
        );
        drop(client);
        session.await.unwrap();
    }

    #[tokio::test]
    async fn list_keeps_storage_order() {
        let (mut client, session) = spawn_session(store(&["zeta", "alpha", "mid"]));
        read_line(&mut client).await;

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let spec = port_spec(&listener);

        assert!(exchange(&mut client, &format!("PORT {}", spec))
            .await
            .starts_with("200"));
        assert!(exchange(&mut client, "LIST").await.starts_with("150"));

        let (mut data, _) = listener.accept().await.unwrap();
        let mut listing = Vec::new();
        data.read_to_end(&mut listing).await.unwrap();
        assert_eq!(listing, b"zeta\r\nalpha\r\nmid\r\n");

        assert!(read_line(&mut client).await.starts_with("226"));
        assert_eq!(exchange(&mut client, "QUIT").await, "221 See ya!");
        session.await.unwrap();
    }

    #[tokio::test]
    async fn end_of_stream_is_implicit_quit() {
        let (mut client, session) = spawn_session(store(&[]));
        read_line(&mut client).await;

        client.get_mut().shutdown().await.unwrap();
        assert_eq!(read_line(&mut client).await, "221 See ya!");
        session.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_port_keeps_previous_endpoint() {
        let (mut client, mut session) = new_session(store(&["only"]));
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let spec = port_spec(&listener);

        let reply = run(&mut session, &mut client, &format!("PORT {}", spec)).await;
        assert_eq!(reply, format!("200 PORT {}", spec));
        let endpoint = session.pending_endpoint();
        assert!(endpoint.is_some());

        assert_eq!(
            run(&mut session, &mut client, "PORT 999,0,0,1,1,1").await,
            "502 Unknown address format: 999,0,0,1,1,1"
        );
        assert_eq!(
            run(&mut session, &mut client, "PORT 127,0,0,1").await,
            "502 Unknown address format: 127,0,0,1"
        );
        assert_eq!(session.pending_endpoint(), endpoint);

        let reader = tokio::spawn(async move {
            let (mut data, _) = listener.accept().await.unwrap();
            let mut listing = Vec::new();
            data.read_to_end(&mut listing).await.unwrap();
            listing
        });

        assert!(run(&mut session, &mut client, "LIST").await.starts_with("150"));
        assert!(read_line(&mut client).await.starts_with("226"));
        assert_eq!(reader.await.unwrap(), b"only\r\n");
        assert_eq!(session.pending_endpoint(), None);
    }

    #[tokio::test]
    async fn wrong_password_keeps_username() {
        let (mut client, mut session) = new_session(store(&[]));

        assert_eq!(
            run(&mut session, &mut client, "USER u").await,
            "331 Password please for u"
        );
        assert_eq!(
            run(&mut session, &mut client, "PASS wrong").await,
            "502 Cannot authenticate user u"
        );
        assert_eq!(session.auth_state(), &AuthState::UsernameGiven("u".into()));

        assert_eq!(
            run(&mut session, &mut client, "PASS p").await,
            "230 Authentication successful"
        );
        assert_eq!(session.auth_state(), &AuthState::Authenticated("u".into()));
    }

    #[tokio::test]
    async fn shutdown_interrupts_stalled_listing() {
        // far more than the socket buffers hold
        let entries = vec!["x".repeat(4096); 8192];
        let (mut client, session) = new_session(FakeStore {
            current: "/home".into(),
            entries,
            broken: false,
        });
        let token = CancellationToken::new();
        let mut session = session.with_shutdown(token.clone());

        // accepted by the kernel, never read
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let spec = port_spec(&listener);
        run(&mut session, &mut client, &format!("PORT {}", spec)).await;

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            token.cancel();
        });

        let flow = tokio::time::timeout(
            Duration::from_secs(5),
            session.dispatch(&Command::parse("LIST")),
        )
        .await
        .expect("LIST should stop at shutdown")
        .unwrap();
        assert_eq!(flow, Flow::Continue);

        assert!(read_line(&mut client).await.starts_with("150"));
        assert_eq!(
            read_line(&mut client).await,
            "502 Error creating data connection with client DTP"
        );
        assert!(!session.data.is_connected());
        drop(listener);
    }
}
