//! DescribeSensor format negotiation.
//!
//! Services implement different SensorML dialects and reject the ones they do
//! not speak. Candidates are tried in order; the first response that is
//! non-empty, well-formed and not an exception report wins.

use std::fmt;

use tracing::debug;

use crate::data::{ServiceError, SosService, parse_response};
use crate::harvest::descriptor::DescriptorDocument;
use crate::harvest::dialect::DescriptorDialect;

/// Every candidate failed for a station.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorNotFound {
    pub station: String,
    /// `(output format, error)` per attempted candidate, in attempt order.
    pub attempts: Vec<(String, ServiceError)>,
}

impl fmt::Display for DescriptorNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "no descriptor formats to try for {}", self.station);
        }
        write!(f, "no usable descriptor for {} (", self.station)?;
        for (idx, (format, err)) in self.attempts.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{format}: {err}")?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for DescriptorNotFound {}

pub fn fetch_descriptor(
    service: &dyn SosService,
    station_id: &str,
    candidates: &[DescriptorDialect],
) -> Result<DescriptorDocument, DescriptorNotFound> {
    let mut attempts = Vec::with_capacity(candidates.len());

    for &dialect in candidates {
        let format = dialect.output_format();
        let result = service
            .describe_sensor(station_id, format)
            .and_then(|raw| parse_response(&raw).map(|root| (root, raw)));

        match result {
            Ok((root, raw)) => {
                debug!(station = station_id, format, "descriptor retrieved");
                return Ok(DescriptorDocument {
                    format: format.to_string(),
                    dialect,
                    root,
                    raw,
                });
            }
            Err(err) => {
                debug!(station = station_id, format, error = %err, "descriptor format rejected");
                attempts.push((format.to_string(), err));
            }
        }
    }

    Err(DescriptorNotFound {
        station: station_id.to_string(),
        attempts,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::domain::ServiceEndpoint;
    use crate::harvest::descriptor::tests::IOOS_DESCRIPTOR;

    /// In-memory service answering DescribeSensor from a
    /// `(procedure, format) -> body` table; anything else is an exception.
    pub(crate) struct FakeService {
        pub endpoint: ServiceEndpoint,
        pub capabilities: Result<String, ServiceError>,
        pub descriptors: HashMap<(String, String), String>,
    }

    impl FakeService {
        pub(crate) fn new(capabilities: &str) -> Self {
            Self {
                endpoint: ServiceEndpoint::parse("https://sos.example.org/sos").unwrap(),
                capabilities: Ok(capabilities.to_string()),
                descriptors: HashMap::new(),
            }
        }

        pub(crate) fn with_descriptor(mut self, station: &str, dialect: DescriptorDialect, body: &str) -> Self {
            self.descriptors.insert(
                (station.to_string(), dialect.output_format().to_string()),
                body.to_string(),
            );
            self
        }
    }

    impl SosService for FakeService {
        fn endpoint(&self) -> &ServiceEndpoint {
            &self.endpoint
        }

        fn get_capabilities(&self) -> Result<String, ServiceError> {
            self.capabilities.clone()
        }

        fn describe_sensor(&self, procedure: &str, output_format: &str) -> Result<String, ServiceError> {
            self.descriptors
                .get(&(procedure.to_string(), output_format.to_string()))
                .cloned()
                .ok_or_else(|| ServiceError::Exception(format!("InvalidParameterValue: outputFormat {output_format}")))
        }
    }

    const STATION: &str = "urn:ioos:station:x:1";

    #[test]
    fn falls_back_to_the_next_format() {
        let service = FakeService::new("").with_descriptor(STATION, DescriptorDialect::SensorMl101, IOOS_DESCRIPTOR);
        let doc = fetch_descriptor(&service, STATION, &DescriptorDialect::ALL).unwrap();
        assert_eq!(doc.dialect, DescriptorDialect::SensorMl101);
        assert_eq!(doc.format, DescriptorDialect::SensorMl101.output_format());
    }

    #[test]
    fn first_success_stops_negotiation() {
        let service = FakeService::new("")
            .with_descriptor(STATION, DescriptorDialect::IoosProfile, IOOS_DESCRIPTOR)
            .with_descriptor(STATION, DescriptorDialect::SensorMl101, "<not-used/>");
        let doc = fetch_descriptor(&service, STATION, &DescriptorDialect::ALL).unwrap();
        assert_eq!(doc.dialect, DescriptorDialect::IoosProfile);
    }

    #[test]
    fn empty_and_malformed_payloads_count_as_failures() {
        let service = FakeService::new("")
            .with_descriptor(STATION, DescriptorDialect::IoosProfile, "")
            .with_descriptor(STATION, DescriptorDialect::SensorMl101, "<sml:System");
        let err = fetch_descriptor(&service, STATION, &DescriptorDialect::ALL).unwrap_err();
        assert_eq!(err.station, STATION);
        assert_eq!(err.attempts.len(), 2);
        assert_eq!(err.attempts[0].1, ServiceError::EmptyPayload);
        assert!(matches!(err.attempts[1].1, ServiceError::Xml(_)));
    }

    #[test]
    fn exhausted_candidates_name_every_format() {
        let service = FakeService::new("");
        let err = fetch_descriptor(&service, STATION, &DescriptorDialect::ALL).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(STATION));
        assert!(message.contains("sensorML/1.0.1/profiles/ioos_sos/1.0"));
        assert!(message.contains("text/xml;subtype=\"sensorML/1.0.1\":"));
    }
}
