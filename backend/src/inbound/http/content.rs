//! Response format negotiation and CSV rendering for report endpoints.
//!
//! An explicit `format` query value wins; otherwise an `Accept` header
//! containing `text/csv` selects CSV. JSON is the default.

use actix_web::HttpResponse;
use actix_web::http::header::{self, HeaderMap};

use crate::domain::Error;
use crate::inbound::http::validation::{FieldName, invalid_value_error};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Negotiated representation of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Csv,
}

/// Decide the response format from the `format` parameter and `Accept`.
pub fn negotiate(format: Option<&str>, headers: &HeaderMap) -> Result<ResponseFormat, Error> {
    if let Some(raw) = format.map(str::trim).filter(|raw| !raw.is_empty()) {
        return match raw.to_ascii_lowercase().as_str() {
            "json" => Ok(ResponseFormat::Json),
            "csv" => Ok(ResponseFormat::Csv),
            _ => Err(invalid_value_error(
                FieldName::new("format"),
                raw,
                r#"format must be "json" or "csv""#,
            )),
        };
    }
    let wants_csv = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.to_ascii_lowercase().contains("text/csv"));
    Ok(if wants_csv {
        ResponseFormat::Csv
    } else {
        ResponseFormat::Json
    })
}

/// Minimal RFC 4180 writer.
#[derive(Debug, Default)]
pub struct CsvWriter {
    out: String,
}

impl CsvWriter {
    pub fn with_header(columns: &[&str]) -> Self {
        let mut writer = Self::default();
        writer.row(columns.iter().map(|column| (*column).to_owned()));
        writer
    }

    pub fn row<I>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = String>,
    {
        let line = fields
            .into_iter()
            .map(|field| escape(&field))
            .collect::<Vec<_>>()
            .join(",");
        self.out.push_str(&line);
        self.out.push_str("\r\n");
        self
    }

    /// Separate two sections of one document.
    pub fn blank_line(&mut self) -> &mut Self {
        self.out.push_str("\r\n");
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

/// Render an optional value, leaving the cell empty when absent.
pub fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Wrap a CSV body as an attachment.
pub fn csv_response(body: String, filename: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(CSV_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderValue, ACCEPT};
    use rstest::rstest;

    fn accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_str(value).expect("header value"));
        headers
    }

    #[rstest]
    #[case(None, "application/json", ResponseFormat::Json)]
    #[case(None, "text/csv", ResponseFormat::Csv)]
    #[case(Some("json"), "text/csv", ResponseFormat::Json)]
    #[case(Some("CSV"), "application/json", ResponseFormat::Csv)]
    fn explicit_format_beats_accept(
        #[case] format: Option<&str>,
        #[case] accept_header: &str,
        #[case] expected: ResponseFormat,
    ) {
        assert_eq!(
            negotiate(format, &accept(accept_header)).expect("negotiated"),
            expected
        );
    }

    #[rstest]
    fn unknown_format_is_unprocessable() {
        let error = negotiate(Some("xml"), &HeaderMap::new()).expect_err("rejected");
        assert_eq!(error.code(), crate::domain::ErrorCode::UnprocessableEntity);
    }

    #[rstest]
    fn writer_quotes_special_fields() {
        let mut writer = CsvWriter::with_header(&["a", "b"]);
        writer.row(["x,y".to_owned(), "say \"hi\"".to_owned()]);
        assert_eq!(writer.finish(), "a,b\r\n\"x,y\",\"say \"\"hi\"\"\"\r\n");
    }

    #[rstest]
    fn missing_cells_render_empty() {
        assert_eq!(cell::<f64>(None), "");
        assert_eq!(cell(Some(1.5)), "1.5");
    }
}
