//! # tds-protocol
//!
//! The parts of MS-TDS (Tabular Data Stream) that describe a result set:
//! type identifiers, the COLMETADATA token, collations and the PLP framing
//! used for large objects.
//!
//! This crate is IO-agnostic. Metadata is parsed from any [`bytes::Buf`];
//! large objects are read incrementally from any [`std::io::Read`], which
//! keeps LOB handling independent of the transport that produced the bytes.
//!
//! ## Example
//!
//! ```rust
//! use tds_protocol::{ColMetaData, ColumnData, TypeId, TypeInfo};
//!
//! let meta = ColMetaData {
//!     columns: vec![ColumnData::new("id", TypeId::Int4, TypeInfo::default())],
//! };
//! let mut wire = meta.encode();
//! let decoded = ColMetaData::decode(&mut wire).unwrap();
//! assert_eq!(decoded.columns[0].name, "id");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod collation;
pub mod error;
pub mod plp;
pub mod token;
pub mod types;

pub use collation::Collation;
pub use error::ProtocolError;
pub use plp::{
    PLP_INITIAL_CAPACITY, PLP_NULL, PLP_UNKNOWN_LEN, PlpReader, encode_plp, encode_plp_null,
};
pub use token::{ColMetaData, ColumnData, TypeInfo, UdtInfo};
pub use types::{ColumnFlags, MAX_LENGTH_PLP, TypeId};
