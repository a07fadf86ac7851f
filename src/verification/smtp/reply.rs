//! Parsing of SMTP server replies.
//!
//! Replies are single- or multi-line; continuation lines use a `-` after
//! the three-digit code and the final line uses a space (or is the bare
//! code).

use crate::verification::smtp::SmtpError;

/// A complete server reply: the status code and the text of every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    /// Positive completion or intermediate (2xx/3xx).
    pub fn is_positive(&self) -> bool {
        (200..400).contains(&self.code)
    }

    /// All reply lines joined into one message string.
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

/// Whether a line terminates a (possibly multi-line) reply.
pub(crate) fn is_last_reply_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    match bytes.len() {
        0..=2 => false,
        3 => bytes.iter().all(u8::is_ascii_digit),
        _ => bytes[3] == b' ',
    }
}

/// Assemble a reply from its raw lines.
pub(crate) fn parse_reply(lines: &[String]) -> Result<Reply, SmtpError> {
    let first = lines
        .first()
        .ok_or_else(|| SmtpError::Protocol("empty reply".to_string()))?;
    // Server-controlled bytes: checked slicing only, a reply must never be
    // able to panic the session.
    let code = first
        .get(..3)
        .and_then(|digits| digits.parse::<u16>().ok())
        .ok_or_else(|| SmtpError::Protocol(format!("invalid reply code: '{first}'")))?;

    let mut text_lines = Vec::with_capacity(lines.len());
    for line in lines {
        // Empty for a bare code, a separator with no message, or a
        // malformed line whose byte 4 is not a character boundary.
        text_lines.push(line.get(4..).unwrap_or("").to_string());
    }
    Ok(Reply {
        code,
        lines: text_lines,
    })
}
