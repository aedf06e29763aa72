//! Data acquisition: the SOS client seam and the XML tree it hands back.

pub mod sos;
pub mod xml;

pub use sos::{HttpSosClient, ServiceError, SosService, parse_response};
pub use xml::{XmlElement, XmlError};
