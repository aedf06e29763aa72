//! ISO 19115-2 (`gmi:MI_Metadata`) rendering.
//!
//! Emits a pragmatic subset of the schema: identification, contacts, keywords,
//! geographic/temporal extent, observed variables and one online resource per
//! example GetObservation link and per linked document. Elements whose source
//! field is absent are omitted rather than written empty.

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;

use crate::domain::time::format_timestamp;
use crate::domain::{Contact, StationRecord};
use crate::render::{RenderError, Renderer};

const NAMESPACES: &[(&str, &str)] = &[
    ("gmi", "http://www.isotc211.org/2005/gmi"),
    ("gmd", "http://www.isotc211.org/2005/gmd"),
    ("gco", "http://www.isotc211.org/2005/gco"),
    ("gml", "http://www.opengis.net/gml/3.2"),
    ("gmx", "http://www.isotc211.org/2005/gmx"),
    ("xlink", "http://www.w3.org/1999/xlink"),
];

const ROLE_CODE_LIST: &str =
    "http://www.ngdc.noaa.gov/metadata/published/xsd/schema/resources/Codelist/gmxCodelists.xml#CI_RoleCode";

#[derive(Debug, Clone)]
pub struct IsoRenderer {
    /// Written as the metadata `dateStamp`.
    generated: DateTime<Utc>,
}

impl IsoRenderer {
    pub fn new(generated: DateTime<Utc>) -> Self {
        Self { generated }
    }
}

impl Renderer for IsoRenderer {
    fn render(&self, record: &StationRecord) -> Result<String, RenderError> {
        if record.identifier.trim().is_empty() {
            return Err(RenderError::EmptyIdentifier);
        }

        let mut doc = Doc::default();
        doc.raw("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        let ns: Vec<String> = NAMESPACES
            .iter()
            .map(|(prefix, uri)| format!("xmlns:{prefix}=\"{uri}\""))
            .collect();
        doc.open_with("gmi:MI_Metadata", &ns.join(" "));

        doc.string_prop("gmd:fileIdentifier", &record.identifier);
        doc.open("gmd:language");
        doc.leaf("gco:CharacterString", "eng");
        doc.close("gmd:language");
        doc.open("gmd:hierarchyLevel");
        doc.raw_line(
            "<gmd:MD_ScopeCode codeList=\"http://www.isotc211.org/2005/resources/Codelist/gmxCodelists.xml#MD_ScopeCode\" codeListValue=\"dataset\">dataset</gmd:MD_ScopeCode>",
        );
        doc.close("gmd:hierarchyLevel");

        for (role, contact) in &record.contacts {
            doc.open("gmd:contact");
            responsible_party(&mut doc, role, contact);
            doc.close("gmd:contact");
        }

        doc.open("gmd:dateStamp");
        doc.leaf("gco:DateTime", &format_timestamp(&self.generated));
        doc.close("gmd:dateStamp");
        doc.string_prop(
            "gmd:metadataStandardName",
            "ISO 19115-2 Geographic Information - Metadata Part 2 Extensions for Imagery and Gridded Data",
        );
        doc.string_prop("gmd:metadataStandardVersion", "ISO 19115-2:2009(E)");

        identification(&mut doc, record);
        content(&mut doc, record);
        distribution(&mut doc, record);

        doc.close("gmi:MI_Metadata");
        Ok(doc.finish())
    }
}

fn title(record: &StationRecord) -> &str {
    record
        .long_name
        .as_deref()
        .or(record.short_name.as_deref())
        .unwrap_or(&record.identifier)
}

fn identification(doc: &mut Doc, record: &StationRecord) {
    doc.open("gmd:identificationInfo");
    doc.open("gmd:MD_DataIdentification");

    doc.open("gmd:citation");
    doc.open("gmd:CI_Citation");
    doc.string_prop("gmd:title", title(record));
    if let Some(short) = &record.short_name {
        doc.string_prop("gmd:alternateTitle", short);
    }
    doc.open("gmd:date");
    doc.open("gmd:CI_Date");
    doc.open("gmd:date");
    doc.leaf("gco:DateTime", &format_timestamp(&record.begin_service_date));
    doc.close("gmd:date");
    doc.open("gmd:dateType");
    doc.raw_line(
        "<gmd:CI_DateTypeCode codeList=\"http://www.isotc211.org/2005/resources/Codelist/gmxCodelists.xml#CI_DateTypeCode\" codeListValue=\"creation\">creation</gmd:CI_DateTypeCode>",
    );
    doc.close("gmd:dateType");
    doc.close("gmd:CI_Date");
    doc.close("gmd:date");
    identifier(doc, &record.identifier);
    if let Some(wmo) = &record.wmo_id {
        identifier(doc, &format!("WMO:{wmo}"));
    }
    doc.close("gmd:CI_Citation");
    doc.close("gmd:citation");

    let summary = record
        .service
        .abstract_
        .as_deref()
        .or(record.service.title.as_deref())
        .unwrap_or(title(record));
    doc.string_prop("gmd:abstract", summary);

    keywords(doc, "theme", &record.variable_names);
    keywords(doc, "theme", &record.service.keywords);
    let platform: Vec<String> = [&record.platform_type, &record.parent_network, &record.sponsor]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    keywords(doc, "platform", &platform);

    doc.string_prop("gmd:language", "eng");

    doc.open("gmd:extent");
    doc.open("gmd:EX_Extent");
    if let Some(pos) = &record.position {
        doc.open("gmd:geographicElement");
        doc.open("gmd:EX_GeographicBoundingBox");
        for (tag, value) in [
            ("gmd:westBoundLongitude", pos.longitude),
            ("gmd:eastBoundLongitude", pos.longitude),
            ("gmd:southBoundLatitude", pos.latitude),
            ("gmd:northBoundLatitude", pos.latitude),
        ] {
            doc.open(tag);
            doc.leaf("gco:Decimal", &value.to_string());
            doc.close(tag);
        }
        doc.close("gmd:EX_GeographicBoundingBox");
        doc.close("gmd:geographicElement");
    }
    doc.open("gmd:temporalElement");
    doc.open("gmd:EX_TemporalExtent");
    doc.open("gmd:extent");
    doc.open_with("gml:TimePeriod", "gml:id=\"observation_window\"");
    time_position(doc, "gml:beginPosition", record.starting.as_ref());
    time_position(doc, "gml:endPosition", record.ending.as_ref());
    doc.close("gml:TimePeriod");
    doc.close("gmd:extent");
    doc.close("gmd:EX_TemporalExtent");
    doc.close("gmd:temporalElement");
    doc.close("gmd:EX_Extent");
    doc.close("gmd:extent");

    doc.close("gmd:MD_DataIdentification");
    doc.close("gmd:identificationInfo");
}

fn identifier(doc: &mut Doc, code: &str) {
    doc.open("gmd:identifier");
    doc.open("gmd:MD_Identifier");
    doc.string_prop("gmd:code", code);
    doc.close("gmd:MD_Identifier");
    doc.close("gmd:identifier");
}

fn keywords(doc: &mut Doc, kind: &str, words: &[String]) {
    if words.is_empty() {
        return;
    }
    doc.open("gmd:descriptiveKeywords");
    doc.open("gmd:MD_Keywords");
    for word in words {
        doc.string_prop("gmd:keyword", word);
    }
    doc.open("gmd:type");
    doc.raw_line(&format!(
        "<gmd:MD_KeywordTypeCode codeList=\"http://www.isotc211.org/2005/resources/Codelist/gmxCodelists.xml#MD_KeywordTypeCode\" codeListValue=\"{kind}\">{kind}</gmd:MD_KeywordTypeCode>"
    ));
    doc.close("gmd:type");
    doc.close("gmd:MD_Keywords");
    doc.close("gmd:descriptiveKeywords");
}

fn time_position(doc: &mut Doc, tag: &str, value: Option<&DateTime<Utc>>) {
    match value {
        Some(dt) => doc.leaf(tag, &format_timestamp(dt)),
        None => doc.raw_line(&format!("<{tag} indeterminatePosition=\"unknown\"/>")),
    }
}

fn responsible_party(doc: &mut Doc, role: &str, contact: &Contact) {
    doc.open("gmd:CI_ResponsibleParty");
    if let Some(org) = &contact.organization {
        doc.string_prop("gmd:organisationName", org);
    }
    doc.open("gmd:contactInfo");
    doc.open("gmd:CI_Contact");
    if contact.country.is_some() || contact.email.is_some() {
        doc.open("gmd:address");
        doc.open("gmd:CI_Address");
        if let Some(country) = &contact.country {
            doc.string_prop("gmd:country", country);
        }
        if let Some(email) = &contact.email {
            doc.string_prop("gmd:electronicMailAddress", email);
        }
        doc.close("gmd:CI_Address");
        doc.close("gmd:address");
    }
    if let Some(url) = &contact.url {
        doc.open("gmd:onlineResource");
        online_resource(doc, &escape(url), None, None);
        doc.close("gmd:onlineResource");
    }
    doc.close("gmd:CI_Contact");
    doc.close("gmd:contactInfo");
    doc.open("gmd:role");
    let role = escape(role);
    doc.raw_line(&format!(
        "<gmd:CI_RoleCode codeList=\"{ROLE_CODE_LIST}\" codeListValue=\"{role}\">{role}</gmd:CI_RoleCode>"
    ));
    doc.close("gmd:role");
    doc.close("gmd:CI_ResponsibleParty");
}

/// `linkage` must already be markup-safe.
fn online_resource(doc: &mut Doc, linkage: &str, name: Option<&str>, description: Option<&str>) {
    doc.open("gmd:CI_OnlineResource");
    doc.open("gmd:linkage");
    doc.raw_line(&format!("<gmd:URL>{linkage}</gmd:URL>"));
    doc.close("gmd:linkage");
    if let Some(name) = name {
        doc.string_prop("gmd:name", name);
    }
    if let Some(description) = description {
        doc.string_prop("gmd:description", description);
    }
    doc.close("gmd:CI_OnlineResource");
}

fn content(doc: &mut Doc, record: &StationRecord) {
    if record.variables.is_empty() {
        return;
    }
    doc.open("gmd:contentInfo");
    doc.open("gmi:MI_CoverageDescription");
    doc.string_prop("gmd:attributeDescription", "observed parameters");
    doc.open("gmd:contentType");
    doc.raw_line(
        "<gmd:MD_CoverageContentTypeCode codeList=\"http://www.isotc211.org/2005/resources/Codelist/gmxCodelists.xml#MD_CoverageContentTypeCode\" codeListValue=\"physicalMeasurement\">physicalMeasurement</gmd:MD_CoverageContentTypeCode>",
    );
    doc.close("gmd:contentType");
    for (uri, name) in record.variables.iter().zip(&record.variable_names) {
        doc.open("gmd:dimension");
        doc.open("gmd:MD_Band");
        doc.open("gmd:sequenceIdentifier");
        doc.open("gco:MemberName");
        doc.string_prop("gco:aName", name);
        doc.open("gco:attributeType");
        doc.leaf("gco:TypeName", uri);
        doc.close("gco:attributeType");
        doc.close("gco:MemberName");
        doc.close("gmd:sequenceIdentifier");
        doc.close("gmd:MD_Band");
        doc.close("gmd:dimension");
    }
    doc.close("gmi:MI_CoverageDescription");
    doc.close("gmd:contentInfo");
}

fn distribution(doc: &mut Doc, record: &StationRecord) {
    if record.observation_links.is_empty() && record.documents.is_empty() {
        return;
    }
    doc.open("gmd:distributionInfo");
    doc.open("gmd:MD_Distribution");

    for link in record.observation_links.values() {
        doc.open("gmd:distributor");
        doc.open("gmd:MD_Distributor");
        doc.open("gmd:distributorFormat");
        doc.open("gmd:MD_Format");
        doc.string_prop("gmd:name", &link.format_name);
        doc.raw_line("<gmd:version gco:nilReason=\"inapplicable\"/>");
        doc.close("gmd:MD_Format");
        doc.close("gmd:distributorFormat");
        doc.open("gmd:distributorTransferOptions");
        doc.open("gmd:MD_DigitalTransferOptions");
        doc.open("gmd:onLine");
        // Link URLs are stored with `&` already escaped.
        let linkage = link.url.replace('<', "&lt;").replace('>', "&gt;");
        online_resource(
            doc,
            &linkage,
            Some(link.variable.as_str()),
            Some(link.format_type.as_str()),
        );
        doc.close("gmd:onLine");
        doc.close("gmd:MD_DigitalTransferOptions");
        doc.close("gmd:distributorTransferOptions");
        doc.close("gmd:MD_Distributor");
        doc.close("gmd:distributor");
    }

    let linked: Vec<_> = record
        .documents
        .iter()
        .filter_map(|(name, d)| d.url.as_deref().map(|url| (name, url, d.format.as_deref())))
        .collect();
    if !linked.is_empty() {
        doc.open("gmd:transferOptions");
        doc.open("gmd:MD_DigitalTransferOptions");
        for (name, url, format) in linked {
            doc.open("gmd:onLine");
            online_resource(doc, &escape(url), Some(name.as_str()), format);
            doc.close("gmd:onLine");
        }
        doc.close("gmd:MD_DigitalTransferOptions");
        doc.close("gmd:transferOptions");
    }

    doc.close("gmd:MD_Distribution");
    doc.close("gmd:distributionInfo");
}

/// Indented line-oriented XML builder. Text passed to `leaf`/`string_prop`
/// is escaped; `raw`/`raw_line` is written as-is.
#[derive(Default)]
struct Doc {
    out: String,
    depth: usize,
}

impl Doc {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn raw_line(&mut self, text: &str) {
        self.indent();
        self.raw(text);
    }

    fn open(&mut self, tag: &str) {
        self.raw_line(&format!("<{tag}>"));
        self.depth += 1;
    }

    fn open_with(&mut self, tag: &str, attrs: &str) {
        self.raw_line(&format!("<{tag} {attrs}>"));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.raw_line(&format!("</{tag}>"));
    }

    fn leaf(&mut self, tag: &str, text: &str) {
        self.raw_line(&format!("<{tag}>{}</{tag}>", escape(text)));
    }

    /// `<tag><gco:CharacterString>text</gco:CharacterString></tag>`
    fn string_prop(&mut self, tag: &str, text: &str) {
        self.raw_line(&format!(
            "<{tag}><gco:CharacterString>{}</gco:CharacterString></{tag}>",
            escape(text)
        ));
    }

    fn finish(self) -> String {
        self.out
    }
}
