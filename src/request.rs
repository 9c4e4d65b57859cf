use std::io::{self, BufRead, ErrorKind, Read, Take};

use tiny_http::{Header, Method};

use crate::logger::get_reporter;
use crate::utils::{ErrorStr, Result};


const MODULE: &str = "REQUEST";

pub const EMPTY_REQUEST_ERROR: &str = "empty request";
pub const MALFORMED_REQUEST_LINE_ERROR: &str = "malformed request line";
pub const NOT_UTF8_ERROR: &str = "request head is not utf-8";
pub const BAD_CONTENT_LENGTH_ERROR: &str = "bad content length";
pub const HEAD_TOO_LARGE_ERROR: &str = "request head too large";
pub const BODY_TOO_LARGE_ERROR: &str = "body too large";
pub const TRUNCATED_BODY_ERROR: &str = "truncated body";
pub const TIMEOUT_ERROR: &str = "read timed out";
pub const IO_ERROR: &str = "io error";


#[derive(Debug)]
pub struct Request {
    pub method: Method,
    /// Raw request target, path and query together
    pub url: String,
    pub path: String,
    pub query: Option<String>,
    pub http_version: String,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Request {
    /// Read one request: request line, headers up to the blank line, then exactly `Content-Length`
    /// body bytes. The request line and headers together may not exceed `max_head` bytes, bodies
    /// above `max_body` bytes are refused before reading.
    pub fn read_from<R: BufRead>(reader: &mut R, max_head: usize, max_body: usize) -> Result<Request> {
        let (line, headers) = {
            let mut head = reader.by_ref().take(max_head as u64);
            let line = read_line(&mut head)?.ok_or(EMPTY_REQUEST_ERROR)?;
            (line, read_headers(&mut head)?)
        };

        let mut tokens = line.split_whitespace();
        let (method, url) = match (tokens.next(), tokens.next()) {
            (Some(m), Some(u)) => (m, u.to_string()),
            _ => return Err(MALFORMED_REQUEST_LINE_ERROR),
        };
        let method = method.parse::<Method>().map_err(|_| MALFORMED_REQUEST_LINE_ERROR)?;
        let http_version = tokens.next().unwrap_or_default().to_string();

        let (path, query) = match url.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (url.clone(), None),
        };

        let mut request = Request { method, url, path, query, http_version, headers, body: Vec::new() };

        if let Some(len) = request.content_length()? {
            if len > max_body {
                return Err(BODY_TOO_LARGE_ERROR);
            }
            request.body = vec![0; len];
            reader.read_exact(&mut request.body).map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => TRUNCATED_BODY_ERROR,
                _ => map_io(e),
            })?;
        }
        Ok(request)
    }

    /// Value of the first header named `name`, case-insensitive
    pub fn header(&self, name: &'static str) -> Option<&str> {
        self.headers.iter().find(|h| h.field.equiv(name)).map(|h| h.value.as_str())
    }

    pub fn content_length(&self) -> Result<Option<usize>> {
        match self.header("Content-Length") {
            Some(v) => v.trim().parse::<usize>().map(Some).map_err(|_| BAD_CONTENT_LENGTH_ERROR),
            None => Ok(None),
        }
    }
}

fn read_headers<R: BufRead>(reader: &mut Take<R>) -> Result<Vec<Header>> {
    let mut headers = Vec::new();
    while let Some(line) = read_line(reader)? {
        if line.is_empty() {
            break;
        }
        match line.parse::<Header>() {
            Ok(h) => headers.push(h),
            Err(_) => debug!("[{}] Skip unparsable header line `{}`", MODULE, line),
        }
    }
    Ok(headers)
}

/// Next line without its terminator, None at end of stream. Running out of the head budget before
/// the line ends is an error.
fn read_line<R: BufRead>(reader: &mut Take<R>) -> Result<Option<String>> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(_) if reader.limit() == 0 && !line.ends_with('\n') => Err(HEAD_TOO_LARGE_ERROR),
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string())),
        Err(e) if e.kind() == ErrorKind::InvalidData => Err(NOT_UTF8_ERROR),
        Err(e) => Err(map_io(e)),
    }
}

fn map_io(e: io::Error) -> ErrorStr {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => TIMEOUT_ERROR,
        _ => get_reporter(MODULE, "IO", IO_ERROR)(e),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const MAX_HEAD: usize = 256;
    const MAX_BODY: usize = 1024;

    fn parse(raw: &str) -> Result<Request> {
        Request::read_from(&mut raw.as_bytes(), MAX_HEAD, MAX_BODY)
    }

    #[test]
    fn get_with_query() {
        let r = parse("GET /users/delete?user=bob HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
        assert_eq!(r.method, Method::Get);
        assert_eq!(r.url, "/users/delete?user=bob");
        assert_eq!(r.path, "/users/delete");
        assert_eq!(r.query.as_deref(), Some("user=bob"));
        assert_eq!(r.http_version, "HTTP/1.1");
        assert_eq!(r.header("host"), Some("localhost"));
        assert!(r.body.is_empty());
    }

    #[test]
    fn post_body_is_read_by_content_length() {
        let raw = "POST /login HTTP/1.1\r\ncontent-length: 14\r\n\r\nusername=admintrailing";
        let r = parse(raw).unwrap();
        assert_eq!(r.method, Method::Post);
        assert_eq!(r.path, "/login");
        assert_eq!(r.query, None);
        assert_eq!(r.body, b"username=admin");
    }

    #[test]
    fn bare_lf_line_endings_are_accepted() {
        let r = parse("POST /users/add HTTP/1.1\nContent-Length: 3\n\na=b").unwrap();
        assert_eq!(r.body, b"a=b");
    }

    #[test]
    fn unparsable_header_lines_are_ignored() {
        let r = parse("GET / HTTP/1.1\r\nnot a header\r\nX-A: 1\r\n\r\n").unwrap();
        assert_eq!(r.headers.len(), 1);
        assert_eq!(r.header("x-a"), Some("1"));
    }

    #[test]
    fn request_line_with_one_token_is_malformed() {
        assert_eq!(parse("GET\r\n\r\n").unwrap_err(), MALFORMED_REQUEST_LINE_ERROR);
        assert_eq!(parse("\r\n\r\n").unwrap_err(), MALFORMED_REQUEST_LINE_ERROR);
    }

    #[test]
    fn closed_connection_is_empty_request() {
        assert_eq!(parse("").unwrap_err(), EMPTY_REQUEST_ERROR);
    }

    #[test]
    fn content_length_errors() {
        assert_eq!(
            parse("POST /login HTTP/1.1\r\nContent-Length: abc\r\n\r\n").unwrap_err(),
            BAD_CONTENT_LENGTH_ERROR
        );
        assert_eq!(
            parse("POST /login HTTP/1.1\r\nContent-Length: 4096\r\n\r\n").unwrap_err(),
            BODY_TOO_LARGE_ERROR
        );
        assert_eq!(
            parse("POST /login HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").unwrap_err(),
            TRUNCATED_BODY_ERROR
        );
    }

    #[test]
    fn non_utf8_head_is_rejected() {
        let raw: &[u8] = b"GET /\xff HTTP/1.1\r\n\r\n";
        assert_eq!(Request::read_from(&mut &raw[..], MAX_HEAD, MAX_BODY).unwrap_err(), NOT_UTF8_ERROR);
    }

    #[test]
    fn oversized_head_is_rejected() {
        let big_header = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "a".repeat(MAX_HEAD));
        assert_eq!(parse(&big_header).unwrap_err(), HEAD_TOO_LARGE_ERROR);

        let long_target = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_HEAD));
        assert_eq!(parse(&long_target).unwrap_err(), HEAD_TOO_LARGE_ERROR);

        let many_headers = format!("GET / HTTP/1.1\r\n{}\r\n", "X-A: 1\r\n".repeat(MAX_HEAD / 4));
        assert_eq!(parse(&many_headers).unwrap_err(), HEAD_TOO_LARGE_ERROR);
    }

    #[test]
    fn head_budget_does_not_cover_body() {
        let head = "POST /users/add HTTP/1.1\r\nContent-Length: 512\r\n\r\n";
        let body = "a".repeat(512);
        let r = parse(&format!("{}{}", head, body)).unwrap();
        assert_eq!(r.body.len(), 512);
    }
}
