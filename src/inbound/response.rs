use super::PingError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

pub const XML_CONTENT_TYPE: &str = "text/xml;charset=UTF-8";

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Builds the protocol envelope. `error` is 0 for success, 1 otherwise.
pub fn generate_response(error: u8, message: Option<&str>) -> String {
    let mut xml = String::with_capacity(96);
    xml.push_str(XML_HEADER);
    xml.push_str("<response><error>");
    xml.push_str(&error.to_string());
    xml.push_str("</error>");
    if let Some(message) = message {
        xml.push_str("<message>");
        xml.push_str(&escape_xml(message));
        xml.push_str("</message>");
    }
    xml.push_str("</response>");
    xml
}

/// Escapes text content. Quotes are left alone, they are legal outside attributes.
fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub struct XmlResponse {
    pub status: StatusCode,
    pub body: String,
}

impl XmlResponse {
    pub fn success() -> Self {
        Self {
            status: StatusCode::OK,
            body: generate_response(0, None),
        }
    }

    pub fn failure(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: generate_response(1, Some(message)),
        }
    }
}

impl IntoResponse for XmlResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            self.body,
        )
            .into_response()
    }
}

impl From<PingError> for XmlResponse {
    fn from(err: PingError) -> Self {
        XmlResponse::failure(err.status_code(), &err.to_string())
    }
}

impl IntoResponse for PingError {
    fn into_response(self) -> Response {
        XmlResponse::from(self).into_response()
    }
}
