//! Building-XML generation: complement classification, per-record encoding
//! and the batch orchestrator.

pub mod batch;
pub mod complemento;
pub mod encoder;

pub use batch::{generate_xml_batch, XmlBatchOutcome};
pub use complemento::{complement_argument, complement_code};
pub use encoder::{encode_building, parse_coordinate};
