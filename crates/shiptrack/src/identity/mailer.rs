//! Delivery of password-reset links.

use crate::identity::AuthError;
use crate::sanitize::redact_email;

/// Sends password-reset messages.
pub trait ResetMailer: Send + Sync {
    fn send_reset(&self, email: &str, token: &str) -> Result<(), AuthError>;
}

/// Writes reset tokens to the log instead of sending mail.
///
/// Suitable for local deployments where an operator relays the token. The
/// token itself is only logged at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl ResetMailer for LogMailer {
    fn send_reset(&self, email: &str, token: &str) -> Result<(), AuthError> {
        tracing::info!(email = %redact_email(email), "Password reset requested");
        tracing::debug!(email = %redact_email(email), token = %token, "Password reset token");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn log_output(level: Level) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(captured.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            LogMailer.send_reset("dana@cbx.test", "tok-4f2a9c").unwrap()
        });
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_token_stays_out_of_info_logs() {
        let info = log_output(Level::INFO);
        assert!(info.contains("Password reset requested"));
        assert!(info.contains("d***@cbx.test"));
        assert!(!info.contains("tok-4f2a9c"));
        assert!(!info.contains("dana@cbx.test"));

        assert!(log_output(Level::DEBUG).contains("tok-4f2a9c"));
    }
}
