//! Response-format presentation tables.
//!
//! SOS services advertise observation encodings as MIME-ish strings with
//! inconsistent spacing (`text/xml; subtype=...` vs `text/xml;subtype=...`).
//! Lookups normalize that before consulting the tables. Anything not listed
//! falls back to the raw string for both the type and the display name.

/// (response format, canonical type, display name)
const FORMAT_TABLE: &[(&str, &str, &str)] = &[
    ("application/json", "application/json", "JSON"),
    (
        "application/zip; subtype=x-netcdf",
        "application/x-netcdf",
        "NetCDF",
    ),
    ("application/x-netcdf", "application/x-netcdf", "NetCDF"),
    ("text/csv", "text/csv", "CSV"),
    ("text/tab-separated-values", "text/tab-separated-values", "TSV"),
    (
        "application/vnd.google-earth.kml+xml",
        "application/vnd.google-earth.kml+xml",
        "KML",
    ),
    ("text/xml; subtype=\"om/1.0.0\"", "text/xml", "XML (O&M 1.0)"),
    (
        "text/xml; subtype=\"om/1.0.0/profiles/ioos_sos/1.0\"",
        "text/xml",
        "XML (IOOS SOS v1.0 Profile)",
    ),
    (
        "text/xml; schema=\"ioos/0.6.1\"",
        "text/xml",
        "XML (IOOS DIF SOS v0.6.1)",
    ),
    (
        "application/ioos+xml; version=0.6.1",
        "text/xml",
        "XML (IOOS DIF SOS v0.6.1)",
    ),
];

/// Collapse whitespace around `;` and `=` so equivalent spellings compare equal.
pub fn normalize_format(format: &str) -> String {
    format
        .split(';')
        .map(|part| {
            part.split('=')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("=")
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn lookup(format: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    let key = normalize_format(format);
    FORMAT_TABLE
        .iter()
        .find(|(known, _, _)| normalize_format(known) == key)
}

/// Canonical type for a response format (raw string when unknown).
pub fn format_type(format: &str) -> String {
    lookup(format)
        .map(|(_, ty, _)| ty.to_string())
        .unwrap_or_else(|| format.to_string())
}

/// Display name for a response format (raw string when unknown).
pub fn format_name(format: &str) -> String {
    lookup(format)
        .map(|(_, _, name)| name.to_string())
        .unwrap_or_else(|| format.to_string())
}

/// Whether two format strings denote the same encoding.
pub fn same_format(a: &str, b: &str) -> bool {
    normalize_format(a) == normalize_format(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_formats_map_regardless_of_spacing() {
        let spaced = "text/xml; subtype=\"om/1.0.0/profiles/ioos_sos/1.0\"";
        let tight = "text/xml;subtype=\"om/1.0.0/profiles/ioos_sos/1.0\"";
        assert_eq!(format_type(spaced), "text/xml");
        assert_eq!(format_type(tight), "text/xml");
        assert_eq!(format_name(tight), "XML (IOOS SOS v1.0 Profile)");
        assert!(same_format(spaced, tight));
    }

    #[test]
    fn unknown_format_falls_back_to_itself() {
        assert_eq!(format_type("text/unknown"), "text/unknown");
        assert_eq!(format_name("text/unknown"), "text/unknown");
    }

    #[test]
    fn distinct_formats_do_not_compare_equal() {
        assert!(!same_format("text/csv", "text/tab-separated-values"));
    }
}
