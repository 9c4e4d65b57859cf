use std::io::{self, Write};

use tiny_http::StatusCode;


pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub const HTTP_200: u16 = 200;
pub const HTTP_400: u16 = 400;
pub const HTTP_401: u16 = 401;
pub const HTTP_404: u16 = 404;
pub const HTTP_413: u16 = 413;
pub const HTTP_431: u16 = 431;
pub const HTTP_500: u16 = 500;


#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(code: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Response {
        Response { status: StatusCode(code), content_type, body: body.into() }
    }

    pub fn html(code: u16, body: impl Into<Vec<u8>>) -> Response {
        Response::new(code, TEXT_HTML, body)
    }

    pub fn text(code: u16, body: impl Into<Vec<u8>>) -> Response {
        Response::new(code, TEXT_PLAIN, body)
    }

    pub fn code(&self) -> u16 {
        self.status.0
    }

    /// Serialize as a complete HTTP/1.1 message; the connection is always closed afterwards
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status.0,
            self.status.default_reason_phrase(),
            self.content_type,
            self.body.len(),
        );
        out.write_all(head.as_bytes())?;
        out.write_all(&self.body)?;
        out.flush()?;
        Ok(head.len() + self.body.len())
    }
}
