//! Helpers for keeping personal data out of log lines.

/// Masks the local part of an email address.
///
/// - `dana.lee@cbx.test` → `d***@cbx.test`
/// - `not-an-email` → `***`
pub fn redact_email(email: &str) -> String {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        _ => "***".to_string(),
    }
}

/// Shortens a session or reset token to a prefix usable for correlation.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{}…", prefix)
}
