//! SensorML descriptor extraction.
//!
//! `parse` pulls a flat set of fields out of one DescribeSensor response.
//! Each field is extracted independently: a missing or malformed element
//! leaves that field `None` and adds a warning, and never stops the others.
//! The only hard failure is a document without an `sml:System`.
//!
//! Classifiers may legitimately repeat (e.g. two sponsors). Only the first of
//! each kind is kept; no disambiguation is attempted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::data::XmlElement;
use crate::domain::time::parse_timestamp;
use crate::domain::{Contact, Document, Position};
use crate::harvest::dialect::{DescriptorDialect, last_segment};

/// A DescribeSensor response that parsed as XML and was not an exception.
#[derive(Debug, Clone)]
pub struct DescriptorDocument {
    /// The output format that produced this document.
    pub format: String,
    pub dialect: DescriptorDialect,
    pub root: XmlElement,
    /// Raw response text, kept for verbose diagnostics only.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("descriptor ({format}) has no sml:System element")]
    MissingSystem { format: String },
}

/// Fields extracted from one descriptor, before service-level enrichment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDescriptor {
    pub position: Option<Position>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub wmo_id: Option<String>,
    pub platform_type: Option<String>,
    pub parent_network: Option<String>,
    pub sponsor: Option<String>,
    pub contacts: BTreeMap<String, Contact>,
    pub documents: BTreeMap<String, Document>,
    pub variables: Vec<String>,
    pub variable_names: Vec<String>,
    /// `sml:validTime` begin; `None` leaves the default to the caller.
    pub begin: Option<DateTime<Utc>>,
    /// Field-level problems, one human-readable line each.
    pub warnings: Vec<String>,
}

pub fn parse(document: &DescriptorDocument) -> Result<ParsedDescriptor, DescriptorError> {
    let system = document
        .root
        .first_descendant("sml:System")
        .ok_or_else(|| DescriptorError::MissingSystem {
            format: document.format.clone(),
        })?;

    let mut out = ParsedDescriptor::default();

    // The structured point wins over the legacy coordinate list, whatever
    // dialect the document was negotiated in.
    out.position = DescriptorDialect::ALL
        .into_iter()
        .find_map(|dialect| dialect.position(system));
    if out.position.is_none() {
        out.warnings.push("no parseable position; coordinates left empty".to_string());
    }

    let identifiers = system.find_all("sml:identification/sml:IdentifierList/sml:identifier");
    out.short_name = term_value(&identifiers, "shortName");
    out.long_name = term_value(&identifiers, "longName");
    out.wmo_id = term_value(&identifiers, "wmoID");

    let classifiers = system.find_all("sml:classification/sml:ClassifierList/sml:classifier");
    out.platform_type = term_value(&classifiers, "platformType");
    out.parent_network = term_value(&classifiers, "parentNetwork");
    out.sponsor = term_value(&classifiers, "sponsor");

    for (label, value) in [
        ("short name", &out.short_name),
        ("long name", &out.long_name),
        ("platform type", &out.platform_type),
        ("parent network", &out.parent_network),
        ("sponsor", &out.sponsor),
    ] {
        if value.is_none() {
            out.warnings.push(format!("missing {label}"));
        }
    }

    extract_contacts(system, document.dialect, &mut out);
    extract_documents(system, &mut out);
    extract_variables(system, &mut out);

    match system.find_text("sml:validTime/gml:TimePeriod/gml:beginPosition") {
        Some(raw) => {
            out.begin = parse_timestamp(raw);
            if out.begin.is_none() {
                out.warnings.push(format!("unparseable validTime begin '{raw}'"));
            }
        }
        None => out.warnings.push("no validTime begin position".to_string()),
    }

    Ok(out)
}

/// Value of the first identifier/classifier matching `key` by `name` or by
/// the last segment of its term definition.
fn term_value(entries: &[&XmlElement], key: &str) -> Option<String> {
    entries
        .iter()
        .find(|entry| {
            let by_name = entry
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case(key));
            let by_definition = entry
                .find("sml:Term")
                .and_then(|t| t.attr("definition"))
                .and_then(last_segment)
                .is_some_and(|d| d.eq_ignore_ascii_case(key));
            by_name || by_definition
        })
        .and_then(|entry| entry.find_text("sml:Term/sml:value"))
        .map(str::to_string)
}

fn extract_contacts(system: &XmlElement, dialect: DescriptorDialect, out: &mut ParsedDescriptor) {
    let Some(found) = dialect
        .attempt_order()
        .find_map(|d| d.contacts(system))
    else {
        out.warnings.push("no contacts".to_string());
        return;
    };

    if found.missing_role > 0 {
        out.warnings
            .push(format!("{} contact(s) without a role skipped", found.missing_role));
    }
    // Later roles overwrite earlier ones.
    for (role, contact) in found.entries {
        out.contacts.insert(role, contact);
    }
}

fn extract_documents(system: &XmlElement, out: &mut ParsedDescriptor) {
    for member in system.find_all("sml:documentation/sml:DocumentList/sml:member") {
        let Some(name) = member.attr("name") else {
            out.warnings.push("documentation member without a name skipped".to_string());
            continue;
        };
        let doc = member.child("sml:Document");
        let document = Document {
            url: doc
                .and_then(|d| d.child("sml:onlineResource"))
                .and_then(|r| r.attr("xlink:href"))
                .map(str::to_string),
            format: doc
                .and_then(|d| d.find_text("sml:format"))
                .map(str::to_string),
        };
        // Duplicate names: last one wins.
        out.documents.insert(name.to_string(), document);
    }
}

fn extract_variables(system: &XmlElement, out: &mut ParsedDescriptor) {
    let Some(outputs) = system.child("sml:outputs") else {
        out.warnings.push("no sml:outputs section".to_string());
        return;
    };

    for quantity in outputs.descendants_named("swe:Quantity") {
        let Some(definition) = quantity.attr("definition") else {
            continue;
        };
        if out.variables.iter().any(|v| v == definition) {
            continue;
        }
        let short = last_segment(definition).unwrap_or(definition);
        out.variables.push(definition.to_string());
        out.variable_names.push(short.to_string());
    }

    if out.variables.is_empty() {
        out.warnings.push("no observed parameters".to_string());
    }
}
