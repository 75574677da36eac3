//! Logging helpers for user-supplied strings (usernames, callback payloads)
//! so log lines stay single-line and bounded.

/// Render a user-supplied string safely for logging:
/// control characters become `\xNN` escapes, newlines/tabs their usual
/// two-character forms, and anything past `max` characters is dropped with an
/// ellipsis. Telegram display names and callback payloads are attacker
/// controlled, so they never reach the log verbatim.
pub fn sanitize_for_log(s: &str, max: usize) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(s.len().min(max) + 4);
    for (seen, ch) in s.chars().enumerate() {
        if seen >= max {
            out.push('…');
            break;
        }
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
