//! Minimal SMTP session used for the RCPT probe.
//!
//! This is deliberately not a full SMTP client: it speaks only the
//! greeting, EHLO (with HELO fallback), MAIL FROM, RCPT TO and QUIT, over
//! a connection the connect check already established. Each command
//! round-trip is bounded by the configured SMTP timeout, clamped to the
//! run's remaining deadline budget.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::verification::smtp::reply::{is_last_reply_line, parse_reply, Reply};
use crate::verification::smtp::SmtpError;

/// Upper bound on lines accepted for one reply, blank lines included.
const MAX_REPLY_LINES: usize = 64;

pub(crate) struct SmtpSession {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    command_timeout: Duration,
}

impl SmtpSession {
    pub fn new(stream: TcpStream, command_timeout: Duration) -> Self {
        let (read_half, write_half) = stream.into_split();
        SmtpSession {
            reader: BufReader::new(read_half),
            writer: write_half,
            command_timeout,
        }
    }

    /// Read one complete (possibly multi-line) server reply.
    ///
    /// The whole reply shares one timeout budget, however many
    /// continuation lines the server spreads it over; a server trickling
    /// lines cannot hold the session open past it. The line count is also
    /// capped, so an endless stream of continuations fails fast instead of
    /// consuming the budget.
    pub async fn read_reply(&mut self) -> Result<Reply, SmtpError> {
        let timeout = self.command_timeout;
        let reader = &mut self.reader;
        let read_all = async move {
            let mut lines = Vec::new();
            let mut seen = 0usize;
            loop {
                seen += 1;
                if seen > MAX_REPLY_LINES {
                    return Err(SmtpError::Protocol(format!(
                        "reply exceeded {MAX_REPLY_LINES} lines"
                    )));
                }
                let line = read_line(reader).await?;
                if line.is_empty() {
                    continue;
                }
                let is_last = is_last_reply_line(&line);
                lines.push(line);
                if is_last {
                    break;
                }
            }
            parse_reply(&lines)
        };
        tokio::time::timeout(timeout, read_all)
            .await
            .map_err(|_| SmtpError::Timeout)?
    }

    /// Send one command line and read the server's reply.
    pub async fn command(&mut self, line: &str) -> Result<Reply, SmtpError> {
        tracing::trace!(target: "smtp_probe", ">> {}", line);
        let timeout = self.command_timeout;
        let writer = &mut self.writer;
        let send = async move {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\r\n").await?;
            writer.flush().await
        };
        tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| SmtpError::Timeout)??;
        let reply = self.read_reply().await?;
        tracing::trace!(target: "smtp_probe", "<< {} {}", reply.code, reply.text());
        Ok(reply)
    }

    /// Cleanly terminate the session. Failures are swallowed; the probe's
    /// result was decided before QUIT.
    pub async fn quit(mut self) {
        if let Err(e) = self.command("QUIT").await {
            tracing::debug!(target: "smtp_probe", "QUIT failed: {}", e);
        }
    }

}

/// One raw line off the wire. Unbounded on its own; callers wrap the whole
/// reply in a single timeout.
async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> Result<String, SmtpError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(SmtpError::Protocol(
            "connection closed by server".to_string(),
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    /// Connect a session to a server task that writes whatever `script`
    /// decides, as fast or as slowly as it likes.
    async fn session_against<F, Fut>(command_timeout: Duration, script: F) -> SmtpSession
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            script(stream).await;
        });
        let stream = TcpStream::connect(addr).await.unwrap();
        SmtpSession::new(stream, command_timeout)
    }

    #[tokio::test]
    async fn multi_line_reply_is_assembled() {
        let mut session = session_against(Duration::from_secs(1), |mut stream| async move {
            stream
                .write_all(b"250-mx.test\r\n250-PIPELINING\r\n250 SIZE\r\n")
                .await
                .unwrap();
        })
        .await;

        let reply = session.read_reply().await.unwrap();
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines.len(), 3);
    }

    #[tokio::test]
    async fn trickled_continuation_lines_share_one_timeout() {
        // Each line arrives well inside a per-line timeout; only a
        // whole-reply budget stops this.
        let mut session = session_against(Duration::from_millis(200), |mut stream| async move {
            loop {
                if stream.write_all(b"250-still going\r\n").await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        let started = std::time::Instant::now();
        let result = session.read_reply().await;
        assert!(matches!(result, Err(SmtpError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn endless_continuations_hit_the_line_cap() {
        let mut session = session_against(Duration::from_secs(5), |mut stream| async move {
            for _ in 0..(MAX_REPLY_LINES * 2) {
                if stream.write_all(b"250-x\r\n").await.is_err() {
                    break;
                }
            }
        })
        .await;

        let result = session.read_reply().await;
        assert!(matches!(result, Err(SmtpError::Protocol(_))));
    }

    #[tokio::test]
    async fn blank_lines_count_toward_the_cap() {
        let mut session = session_against(Duration::from_secs(5), |mut stream| async move {
            for _ in 0..(MAX_REPLY_LINES * 2) {
                if stream.write_all(b"\r\n").await.is_err() {
                    break;
                }
            }
        })
        .await;

        let result = session.read_reply().await;
        assert!(matches!(result, Err(SmtpError::Protocol(_))));
    }
}
