//! SensorML descriptor dialects.
//!
//! Services answer DescribeSensor in slightly different shapes. Each dialect
//! knows the output format that requests it and how to pull the
//! shape-variant fields (position, contacts) out of an `sml:System`.
//! Everything else is common and lives in `harvest::descriptor`.

use crate::data::XmlElement;
use crate::domain::{Contact, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorDialect {
    /// IOOS SOS 1.0 profile: `gml:Point` location, `sml:ContactList`.
    IoosProfile,
    /// Plain SensorML 1.0.1: `swe:Vector` position, repeated `sml:contact`.
    SensorMl101,
}

/// Contacts found by one dialect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactEntries {
    /// `(role, contact)` in document order.
    pub entries: Vec<(String, Contact)>,
    /// Contacts skipped because they carry no role.
    pub missing_role: usize,
}

impl DescriptorDialect {
    /// Negotiation order: the richer IOOS profile first.
    pub const ALL: [DescriptorDialect; 2] = [DescriptorDialect::IoosProfile, DescriptorDialect::SensorMl101];

    pub fn output_format(self) -> &'static str {
        match self {
            DescriptorDialect::IoosProfile => {
                "text/xml;subtype=\"sensorML/1.0.1/profiles/ioos_sos/1.0\""
            }
            DescriptorDialect::SensorMl101 => "text/xml;subtype=\"sensorML/1.0.1\"",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DescriptorDialect::IoosProfile => "IOOS SOS 1.0 profile",
            DescriptorDialect::SensorMl101 => "SensorML 1.0.1",
        }
    }

    /// Strategies to try for a document of this dialect: itself, then the rest.
    pub fn attempt_order(self) -> impl Iterator<Item = DescriptorDialect> {
        std::iter::once(self).chain(Self::ALL.into_iter().filter(move |d| *d != self))
    }

    pub fn position(self, system: &XmlElement) -> Option<Position> {
        match self {
            DescriptorDialect::IoosProfile => point_position(system),
            DescriptorDialect::SensorMl101 => vector_position(system),
        }
    }

    /// `None` when the document does not use this dialect's contact shape.
    pub fn contacts(self, system: &XmlElement) -> Option<ContactEntries> {
        let members: Vec<&XmlElement> = match self {
            DescriptorDialect::IoosProfile => {
                let lists = system.find_all("sml:contact/sml:ContactList");
                if lists.is_empty() {
                    return None;
                }
                lists
                    .into_iter()
                    .flat_map(|list| list.children_named("sml:member"))
                    .collect()
            }
            DescriptorDialect::SensorMl101 => {
                let direct: Vec<&XmlElement> = system
                    .children_named("sml:contact")
                    .filter(|c| c.child("sml:ResponsibleParty").is_some())
                    .collect();
                if direct.is_empty() {
                    return None;
                }
                direct
            }
        };

        let mut out = ContactEntries::default();
        for member in members {
            let Some(party) = member.child("sml:ResponsibleParty") else {
                continue;
            };
            match member.attr("xlink:role").and_then(last_segment) {
                Some(role) => out.entries.push((role.to_string(), responsible_party(party))),
                None => out.missing_role += 1,
            }
        }
        Some(out)
    }
}

/// Last path segment of a URI (`.../definition/operator` -> `operator`).
pub fn last_segment(uri: &str) -> Option<&str> {
    uri.trim()
        .trim_end_matches(['/', '#'])
        .rsplit(['/', '#', ':'])
        .next()
        .filter(|s| !s.is_empty())
}

fn responsible_party(party: &XmlElement) -> Contact {
    let info = party.child("sml:contactInfo");
    let address = info.and_then(|i| i.child("sml:address"));
    Contact {
        organization: party.find_text("sml:organizationName").map(str::to_string),
        country: address
            .and_then(|a| a.find_text("sml:country"))
            .map(str::to_string),
        email: address
            .and_then(|a| a.find_text("sml:electronicMailAddress"))
            .map(str::to_string),
        url: info
            .and_then(|i| i.child("sml:onlineResource"))
            .and_then(|r| r.attr("xlink:href"))
            .map(str::to_string),
    }
}

/// `sml:location/gml:Point/gml:pos`, axis order taken from `srsName`.
fn point_position(system: &XmlElement) -> Option<Position> {
    let point = system.find("sml:location/gml:Point")?;
    let pos = point.find_text("gml:pos")?;
    let values: Vec<f64> = pos
        .split_whitespace()
        .filter_map(|v| v.parse::<f64>().ok())
        .collect();
    if values.len() < 2 {
        return None;
    }

    // EPSG:4326 (and unspecified, per IOOS convention) is latitude-first;
    // CRS84-style references are longitude-first.
    let lon_first = point
        .attr("srsName")
        .is_some_and(|srs| srs.contains("CRS84") || srs.contains("CRS:84"));
    let (latitude, longitude) = if lon_first {
        (values[1], values[0])
    } else {
        (values[0], values[1])
    };
    valid_position(longitude, latitude)
}

/// `sml:position/swe:Position/swe:location/swe:Vector/swe:coordinate`.
fn vector_position(system: &XmlElement) -> Option<Position> {
    let vector = system.find("sml:position/swe:Position/swe:location/swe:Vector")?;
    let mut latitude = None;
    let mut longitude = None;
    for coord in vector.children_named("swe:coordinate") {
        let value = coord
            .find_text("swe:Quantity/swe:value")
            .and_then(|v| v.parse::<f64>().ok());
        match coord.attr("name").map(str::to_ascii_lowercase).as_deref() {
            Some("latitude") | Some("lat") => latitude = value,
            Some("longitude") | Some("lon") => longitude = value,
            _ => {}
        }
    }
    valid_position(longitude?, latitude?)
}

fn valid_position(longitude: f64, latitude: f64) -> Option<Position> {
    let ok = longitude.is_finite()
        && latitude.is_finite()
        && (-180.0..=180.0).contains(&longitude)
        && (-90.0..=90.0).contains(&latitude);
    ok.then_some(Position {
        longitude,
        latitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::xml::parse;

    fn system(body: &str) -> XmlElement {
        let xml = format!(
            r#"<sml:System xmlns:sml="http://www.opengis.net/sensorML/1.0.1"
                xmlns:gml="http://www.opengis.net/gml"
                xmlns:swe="http://www.opengis.net/swe/1.0.1"
                xmlns:xlink="http://www.w3.org/1999/xlink">{body}</sml:System>"#
        );
        parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn point_defaults_to_latitude_first() {
        let sys = system(
            r#"<sml:location><gml:Point srsName="http://www.opengis.net/def/crs/EPSG/0/4326"><gml:pos>34.7 -72.7</gml:pos></gml:Point></sml:location>"#,
        );
        let pos = DescriptorDialect::IoosProfile.position(&sys).unwrap();
        assert_eq!(pos.latitude, 34.7);
        assert_eq!(pos.longitude, -72.7);
    }

    #[test]
    fn point_without_srs_name_is_latitude_first() {
        let sys = system(r#"<sml:location><gml:Point><gml:pos>34.7 -72.7</gml:pos></gml:Point></sml:location>"#);
        let pos = DescriptorDialect::IoosProfile.position(&sys).unwrap();
        assert_eq!(pos.latitude, 34.7);
        assert_eq!(pos.longitude, -72.7);
    }

    #[test]
    fn crs84_point_is_longitude_first() {
        let sys = system(
            r#"<sml:location><gml:Point srsName="urn:ogc:def:crs:OGC:1.3:CRS84"><gml:pos>-72.7 34.7</gml:pos></gml:Point></sml:location>"#,
        );
        let pos = DescriptorDialect::IoosProfile.position(&sys).unwrap();
        assert_eq!(pos.longitude, -72.7);
        assert_eq!(pos.latitude, 34.7);
    }

    #[test]
    fn vector_coordinates_are_matched_by_name() {
        let sys = system(
            r#"<sml:position name="stationPosition"><swe:Position><swe:location><swe:Vector>
                <swe:coordinate name="longitude"><swe:Quantity><swe:value>-88.1</swe:value></swe:Quantity></swe:coordinate>
                <swe:coordinate name="latitude"><swe:Quantity><swe:value>30.2</swe:value></swe:Quantity></swe:coordinate>
               </swe:Vector></swe:location></swe:Position></sml:position>"#,
        );
        assert_eq!(DescriptorDialect::IoosProfile.position(&sys), None);
        let pos = DescriptorDialect::SensorMl101.position(&sys).unwrap();
        assert_eq!(pos.longitude, -88.1);
        assert_eq!(pos.latitude, 30.2);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let sys = system(r#"<sml:location><gml:Point><gml:pos>134.7 -72.7</gml:pos></gml:Point></sml:location>"#);
        assert_eq!(DescriptorDialect::IoosProfile.position(&sys), None);
    }

    #[test]
    fn contact_shapes_are_dialect_specific() {
        let listed = system(
            r#"<sml:contact><sml:ContactList>
                <sml:member xlink:role="http://mmisw.org/ont/ioos/definition/operator">
                  <sml:ResponsibleParty><sml:organizationName>NDBC</sml:organizationName></sml:ResponsibleParty>
                </sml:member>
                <sml:member><sml:ResponsibleParty/></sml:member>
              </sml:ContactList></sml:contact>"#,
        );
        let found = DescriptorDialect::IoosProfile.contacts(&listed).unwrap();
        assert_eq!(found.entries.len(), 1);
        assert_eq!(found.entries[0].0, "operator");
        assert_eq!(found.missing_role, 1);
        assert_eq!(DescriptorDialect::SensorMl101.contacts(&listed), None);
    }

    #[test]
    fn attempt_order_starts_with_self() {
        let order: Vec<_> = DescriptorDialect::SensorMl101.attempt_order().collect();
        assert_eq!(order, vec![DescriptorDialect::SensorMl101, DescriptorDialect::IoosProfile]);
    }

    #[test]
    fn last_segment_handles_urls_and_urns() {
        assert_eq!(last_segment("http://mmisw.org/ont/ioos/definition/publisher"), Some("publisher"));
        assert_eq!(last_segment("http://example.org/roles#author/"), Some("author"));
        assert_eq!(last_segment("urn:x-noaa:def:role:operator"), Some("operator"));
        assert_eq!(last_segment(""), None);
    }
}
