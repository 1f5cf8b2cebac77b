//! Status replies written back to the peripheral.

use std::fmt;

use serde::{Deserialize, Serialize};
use vendlink_core::constants::{REPLY_ERR, REPLY_OK};

/// Reply sent to the peripheral after a validation decision.
///
/// Replies are fire-and-forget: the peripheral does not acknowledge them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyCode {
    /// Card accepted, dispensing may start.
    Ok,

    /// Card rejected or could not be validated.
    Err,
}

impl ReplyCode {
    /// ASCII text of the reply.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyCode::Ok => REPLY_OK,
            ReplyCode::Err => REPLY_ERR,
        }
    }

    /// Bytes written on the bus.
    #[must_use]
    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text() {
        assert_eq!(ReplyCode::Ok.as_str(), "OK");
        assert_eq!(ReplyCode::Err.as_str(), "ERR");
        assert_eq!(ReplyCode::Ok.as_bytes(), b"OK");
        assert_eq!(ReplyCode::Err.to_string(), "ERR");
    }
}
