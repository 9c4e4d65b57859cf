use crate::utils::Result;


pub const MALFORMED_FORM_ERROR: &str = "malformed form data";


/// Decoded `application/x-www-form-urlencoded` data, looked up by key
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Form {
    pairs: Vec<(String, String)>,
}

impl Form {
    /// Parse `key=value&key=value`. Empty segments are skipped, a segment without `=` is a key with
    /// an empty value. Fails on invalid percent-encoding.
    pub fn parse(input: &str) -> Result<Form> {
        let mut pairs = Vec::new();
        for segment in input.trim_end_matches(|c: char| c == '\r' || c == '\n').split('&').filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            pairs.push((decode(key)?, decode(value)?));
        }
        Ok(Form { pairs })
    }

    pub fn from_bytes(body: &[u8]) -> Result<Form> {
        let text = std::str::from_utf8(body).map_err(|_| MALFORMED_FORM_ERROR)?;
        Form::parse(text)
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

fn decode(s: &str) -> Result<String> {
    let plus_decoded = s.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|v| v.into_owned())
        .map_err(|_| MALFORMED_FORM_ERROR)
}
