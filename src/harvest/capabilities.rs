//! Capabilities resolution: which stations exist and what they can return.
//!
//! The GetCapabilities document is fetched exactly once per run. Failing to
//! obtain it is the only fatal error in the pipeline, since without it there
//! is no station universe and no service metadata to enrich records with.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::data::{SosService, XmlElement, parse_response};
use crate::domain::time::parse_timestamp;
use crate::domain::{ServiceEndpoint, ServiceMetadata};
use crate::error::AppError;

/// One `sos:ObservationOffering`.
#[derive(Debug, Clone, PartialEq)]
pub struct Offering {
    /// Offering name; for station offerings this is the station identifier.
    pub name: String,
    pub procedure: Option<String>,
    pub observed_properties: Vec<String>,
    pub response_formats: Vec<String>,
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Read-only view of the service's capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilitiesSnapshot {
    pub service: ServiceMetadata,
    /// Operation name -> GET href.
    pub operations: BTreeMap<String, Option<String>>,
    offerings: Vec<Offering>,
}

/// Everything the rest of the run needs from the capabilities step.
#[derive(Debug, Clone)]
pub struct ResolvedCapabilities {
    pub endpoint: ServiceEndpoint,
    pub snapshot: CapabilitiesSnapshot,
    pub universe: Vec<String>,
}

/// Offerings with a `network` segment describe aggregates, not stations.
pub fn is_network_offering(name: &str) -> bool {
    name.split(':').any(|segment| segment == "network")
}

impl CapabilitiesSnapshot {
    /// Build a snapshot from a parsed `sos:Capabilities` document.
    ///
    /// `now` stands in for end positions given as `indeterminatePosition="now"`.
    pub fn from_xml(root: &XmlElement, now: DateTime<Utc>) -> Result<Self, String> {
        if !root.is("sos:Capabilities") {
            return Err(format!(
                "expected sos:Capabilities, found <{}>",
                root.name
            ));
        }

        let service = parse_service_identification(root);
        let operations = parse_operations(root);

        let mut offerings = Vec::new();
        let mut seen = HashSet::new();
        for el in root.find_all("sos:Contents/sos:ObservationOfferingList/sos:ObservationOffering") {
            let Some(offering) = parse_offering(el, now) else {
                debug!("skipping offering without a name");
                continue;
            };
            if seen.insert(offering.name.clone()) {
                offerings.push(offering);
            }
        }

        Ok(Self {
            service,
            operations,
            offerings,
        })
    }

    pub fn offerings(&self) -> &[Offering] {
        &self.offerings
    }

    pub fn offering(&self, name: &str) -> Option<&Offering> {
        self.offerings.iter().find(|o| o.name == name)
    }

    /// Station identifiers: every offering except network aggregates.
    pub fn station_universe(&self) -> Vec<String> {
        self.offerings
            .iter()
            .filter(|o| !is_network_offering(&o.name))
            .map(|o| o.name.clone())
            .collect()
    }
}

/// Fetch capabilities and compute the station universe.
///
/// An explicit station list replaces the computed universe (first occurrence
/// of each identifier kept, in order); it is not checked against the service.
pub fn resolve(
    service: &dyn SosService,
    explicit_stations: Option<&[String]>,
    now: DateTime<Utc>,
) -> Result<ResolvedCapabilities, AppError> {
    let url = service.endpoint().url().as_str().to_string();
    let fatal = |cause: String| {
        AppError::runtime(format!(
            "Unable to read capabilities from SOS service {url}: {cause}"
        ))
    };

    let body = service.get_capabilities().map_err(|e| fatal(e.to_string()))?;
    let root = parse_response(&body).map_err(|e| fatal(e.to_string()))?;
    let snapshot = CapabilitiesSnapshot::from_xml(&root, now).map_err(fatal)?;

    let universe = match explicit_stations {
        Some(stations) => {
            let mut seen = HashSet::new();
            stations
                .iter()
                .filter(|station| seen.insert(station.as_str()))
                .cloned()
                .collect()
        }
        None => snapshot.station_universe(),
    };

    info!(
        offerings = snapshot.offerings().len(),
        stations = universe.len(),
        "resolved capabilities"
    );

    let endpoint = service.endpoint().with_operations(snapshot.operations.clone());
    Ok(ResolvedCapabilities {
        endpoint,
        snapshot,
        universe,
    })
}

fn parse_service_identification(root: &XmlElement) -> ServiceMetadata {
    let Some(ident) = root.child("ows:ServiceIdentification") else {
        return ServiceMetadata::default();
    };
    ServiceMetadata {
        title: ident.find_text("ows:Title").map(str::to_string),
        abstract_: ident.find_text("ows:Abstract").map(str::to_string),
        keywords: ident
            .find_all("ows:Keywords/ows:Keyword")
            .into_iter()
            .filter_map(XmlElement::text)
            .map(str::to_string)
            .collect(),
    }
}

fn parse_operations(root: &XmlElement) -> BTreeMap<String, Option<String>> {
    root.find_all("ows:OperationsMetadata/ows:Operation")
        .into_iter()
        .filter_map(|op| {
            let name = op.attr("name")?.to_string();
            let href = op
                .find("ows:DCP/ows:HTTP/ows:Get")
                .and_then(|get| get.attr("xlink:href"))
                .map(str::to_string);
            Some((name, href))
        })
        .collect()
}

fn parse_offering(el: &XmlElement, now: DateTime<Utc>) -> Option<Offering> {
    let name = el
        .find_text("gml:name")
        .or_else(|| el.attr("gml:id"))?
        .to_string();

    let href_or_text = |e: &XmlElement| {
        e.attr("xlink:href")
            .or_else(|| e.text())
            .map(str::to_string)
    };

    let period = el.find("sos:time/gml:TimePeriod");
    let position = |tag: &str| -> Option<DateTime<Utc>> {
        let pos = period?.child(tag)?;
        match pos.text() {
            Some(text) => parse_timestamp(text),
            None if pos.attr("indeterminatePosition") == Some("now") => Some(now),
            None => None,
        }
    };

    Some(Offering {
        procedure: el.child("sos:procedure").and_then(href_or_text),
        observed_properties: el
            .children_named("sos:observedProperty")
            .filter_map(href_or_text)
            .collect(),
        response_formats: el
            .children_named("sos:responseFormat")
            .filter_map(XmlElement::text)
            .map(str::to_string)
            .collect(),
        begin: position("gml:beginPosition"),
        end: position("gml:endPosition"),
        name,
    })
}
