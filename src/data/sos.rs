//! SOS 1.0.0 key-value-pair client.
//!
//! The harvest pipeline only ever talks to a service through `SosService`, so
//! the HTTP client here is one implementation among (test) others.

use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::data::xml::XmlElement;
use crate::domain::ServiceEndpoint;
use crate::error::AppError;

/// Why a single request to the service did not produce a usable document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("service exception: {0}")]
    Exception(String),
    #[error("empty response")]
    EmptyPayload,
    #[error("{0}")]
    Xml(#[from] crate::data::xml::XmlError),
}

/// Operations the pipeline needs from a Sensor Observation Service.
pub trait SosService: Sync {
    fn endpoint(&self) -> &ServiceEndpoint;

    /// Raw GetCapabilities response body.
    fn get_capabilities(&self) -> Result<String, ServiceError>;

    /// Raw DescribeSensor response body for `procedure` in `output_format`.
    fn describe_sensor(&self, procedure: &str, output_format: &str) -> Result<String, ServiceError>;
}

pub struct HttpSosClient {
    client: Client,
    endpoint: ServiceEndpoint,
}

impl HttpSosClient {
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sml2iso/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint })
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<String, ServiceError> {
        let url = self.endpoint.url().as_str();
        let resp = self
            .client
            .get(self.endpoint.url().clone())
            .query(params)
            .send()
            .map_err(|e| ServiceError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().map_err(|e| ServiceError::Transport {
            url: url.to_string(),
            message: format!("failed to read body: {e}"),
        })
    }
}

impl SosService for HttpSosClient {
    fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    fn get_capabilities(&self) -> Result<String, ServiceError> {
        self.get(&[
            ("service", "SOS"),
            ("request", "GetCapabilities"),
            ("acceptVersions", self.endpoint.version()),
        ])
    }

    fn describe_sensor(&self, procedure: &str, output_format: &str) -> Result<String, ServiceError> {
        self.get(&[
            ("service", "SOS"),
            ("request", "DescribeSensor"),
            ("version", self.endpoint.version()),
            ("procedure", procedure),
            ("outputFormat", output_format),
        ])
    }
}

/// Parse a response body, turning empty payloads and OWS exception reports
/// into `ServiceError`s.
pub fn parse_response(body: &str) -> Result<XmlElement, ServiceError> {
    if body.trim().is_empty() {
        return Err(ServiceError::EmptyPayload);
    }
    let root = crate::data::xml::parse(body.as_bytes())?;
    if root.is("ows:ExceptionReport") {
        return Err(ServiceError::Exception(exception_message(&root)));
    }
    Ok(root)
}

fn exception_message(report: &XmlElement) -> String {
    let texts: Vec<&str> = report
        .descendants_named("ows:ExceptionText")
        .into_iter()
        .filter_map(XmlElement::text)
        .collect();
    if !texts.is_empty() {
        return texts.join("; ");
    }
    report
        .first_descendant("ows:Exception")
        .and_then(|e| e.attr("exceptionCode"))
        .map(str::to_string)
        .unwrap_or_else(|| "unspecified exception report".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_report_becomes_service_error() {
        let body = r#"<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1" version="1.0.0">
  <ows:Exception exceptionCode="InvalidParameterValue" locator="procedure">
    <ows:ExceptionText>Invalid procedure urn:ioos:station:x:nope</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>"#;
        assert_eq!(
            parse_response(body).unwrap_err(),
            ServiceError::Exception("Invalid procedure urn:ioos:station:x:nope".to_string())
        );
    }

    #[test]
    fn exception_without_text_reports_code() {
        let body = r#"<ExceptionReport xmlns="http://www.opengis.net/ows/1.1"><Exception exceptionCode="NoApplicableCode"/></ExceptionReport>"#;
        assert_eq!(
            parse_response(body).unwrap_err(),
            ServiceError::Exception("NoApplicableCode".to_string())
        );
    }

    #[test]
    fn blank_body_is_empty_payload() {
        assert_eq!(parse_response("  \n").unwrap_err(), ServiceError::EmptyPayload);
    }

    #[test]
    fn malformed_body_is_xml_error() {
        assert!(matches!(parse_response("<a><b>"), Err(ServiceError::Xml(_))));
    }
}
