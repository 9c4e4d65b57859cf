use rand::Rng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};


pub type ErrorStr = &'static str;
pub type Result<T> = std::result::Result<T, ErrorStr>;
pub type ResultV = Result<()>;

const QID_CHARSET: &[u8] = b"0123456789abcdef";

pub fn generate_hex_id(length: u32) -> String {
    let mut rng = rand::thread_rng();

    (0..length).map(
        |_| {
            let idx = rng.gen_range(0..QID_CHARSET.len());
            QID_CHARSET[idx] as char
        }
    ).collect()
}


fn current_duration() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

pub fn time_us() -> u128 {
    current_duration().as_micros()
}

/// Escape text for embedding into HTML element content or a quoted attribute
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&'  => out.push_str("&amp;"),
            '<'  => out.push_str("&lt;"),
            '>'  => out.push_str("&gt;"),
            '"'  => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _    => out.push(c),
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_id_has_requested_length_and_charset() {
        let id = generate_hex_id(16);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn escape_html_replaces_markup() {
        assert_eq!(escape_html("<b>'a' & \"b\"</b>"), "&lt;b&gt;&#39;a&#39; &amp; &quot;b&quot;&lt;/b&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
