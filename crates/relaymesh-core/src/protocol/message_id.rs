//! Message-id conventions.
//!
//! `"<service>.<local>"` names a routed message; a bare `"<local>"` is handled
//! by the receiving process. The split happens at the first `.`.

/// Split `id` into `(service, local)`. `service` is empty for local messages.
pub fn split_message_id(id: &str) -> (&str, &str) {
    match id.split_once('.') {
        Some((service, local)) => (service, local),
        None => ("", id),
    }
}

/// `^[A-Za-z0-9]+$`
pub fn is_plain_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric())
}
