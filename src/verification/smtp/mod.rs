//! The SMTP recipient probe: the most expensive and most conclusive check.

pub(crate) mod reply;
pub(crate) mod session;

use thiserror::Error;
use tokio::net::TcpStream;

use crate::core::address::EmailAddressParts;
use crate::core::config::Config;
use crate::core::error::VerifyError;
use crate::verification::smtp::reply::Reply;
use crate::verification::smtp::session::SmtpSession;

/// Internal session failure, mapped onto [`VerifyError::RcptRejected`] at
/// the step boundary.
#[derive(Error, Debug)]
pub(crate) enum SmtpError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed server reply: {0}")]
    Protocol(String),
    #[error("server rejected command: {} {}", .0.code, .0.text())]
    Rejected(Reply),
    #[error("command round-trip timed out")]
    Timeout,
}

/// Probe whether the connected mail host accepts mail for `parts`.
///
/// Issues MAIL FROM with the fixed probe sender, then RCPT TO for the
/// target; only a positive RCPT reply counts as success. The session is
/// always terminated with QUIT, whatever happened before.
pub(crate) async fn rcpt_probe(
    config: &Config,
    stream: TcpStream,
    host: &str,
    parts: &EmailAddressParts,
    command_timeout: std::time::Duration,
) -> Result<(), VerifyError> {
    let mut session = SmtpSession::new(stream, command_timeout);
    let result = probe_dialogue(config, &mut session, parts).await;
    session.quit().await;

    result.map_err(|e| {
        tracing::debug!(target: "smtp_probe",
            "RCPT probe for <{}> via {} failed: {}", parts.full_address, host, e);
        let code = match &e {
            SmtpError::Rejected(reply) => Some(reply.code),
            _ => None,
        };
        VerifyError::RcptRejected {
            address: parts.full_address.clone(),
            code,
            reason: e.to_string(),
        }
    })
}

async fn probe_dialogue(
    config: &Config,
    session: &mut SmtpSession,
    parts: &EmailAddressParts,
) -> Result<(), SmtpError> {
    let greeting = session.read_reply().await?;
    if !greeting.is_positive() {
        return Err(SmtpError::Rejected(greeting));
    }

    let ehlo = session
        .command(&format!("EHLO {}", config.helo_hostname))
        .await?;
    if !ehlo.is_positive() {
        // Older servers may only speak HELO.
        let helo = session
            .command(&format!("HELO {}", config.helo_hostname))
            .await?;
        if !helo.is_positive() {
            return Err(SmtpError::Rejected(helo));
        }
    }

    let mail = session
        .command(&format!("MAIL FROM:<{}>", config.probe_sender))
        .await?;
    if !mail.is_positive() {
        return Err(SmtpError::Rejected(mail));
    }

    let rcpt = session
        .command(&format!("RCPT TO:<{}>", parts.full_address))
        .await?;
    if !rcpt.is_positive() {
        return Err(SmtpError::Rejected(rcpt));
    }

    Ok(())
}
