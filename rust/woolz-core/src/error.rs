// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for Woolz object operations.

use crate::grey::GreyType;
use crate::keys::{ElemIdx, NodeIdx};

/// Result type alias for Woolz operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required object, domain or value table is missing.
    NullInput,
    /// Object, domain, value or parameter kind does not fit the operation.
    TypeMismatch,
    /// Parameters or entity data are malformed.
    ParameterData,
    /// Scratch or output storage could not be obtained.
    Allocation,
    /// A recognised but unsupported combination was requested.
    Unimplemented,
}

/// Errors that can occur during Woolz object operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The object is missing.
    #[error("object is null")]
    ObjectNull,

    /// The object has no domain.
    #[error("object domain is null")]
    DomainNull,

    /// The object has no values where values are required.
    #[error("object values are null")]
    ValuesNull,

    /// The object kind is not handled by the operation.
    #[error("object type mismatch: expected {expected}, found {found}")]
    ObjectType {
        expected: &'static str,
        found: &'static str,
    },

    /// The domain kind is not handled by the operation.
    #[error("domain type mismatch: {0}")]
    DomainType(&'static str),

    /// The value table kind is not handled by the operation.
    #[error("values type mismatch: {0}")]
    ValuesType(&'static str),

    /// A polygon of unsupported vertex type.
    #[error("polygon type mismatch: {0}")]
    PolygonType(&'static str),

    /// A parameter selects an unsupported method.
    #[error("parameter type mismatch: {0}")]
    ParamType(String),

    /// A numeric parameter is out of range.
    #[error("invalid parameter data: {0}")]
    ParamData(String),

    /// Domain contents are inconsistent with the operation.
    #[error("invalid domain data: {0}")]
    DomainData(String),

    /// Value contents are inconsistent with the operation.
    #[error("invalid values data: {0}")]
    ValuesData(String),

    /// The grey type is not handled by the operation.
    #[error("unsupported grey type: {0}")]
    GreyType(GreyType),

    /// Scratch or output buffer allocation failed.
    #[error("out of memory")]
    OutOfMemory,

    /// Known but unsupported request.
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),

    /// The interpolation method is not known to the operation.
    #[error("unsupported interpolation type: {0}")]
    InterpolationType(String),

    /// Node index not found in the mesh.
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeIdx),

    /// Element index not found in the mesh.
    #[error("element not found: {0:?}")]
    ElementNotFound(ElemIdx),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ObjectNull | Error::DomainNull | Error::ValuesNull => ErrorKind::NullInput,
            Error::ObjectType { .. }
            | Error::DomainType(_)
            | Error::ValuesType(_)
            | Error::PolygonType(_)
            | Error::ParamType(_)
            | Error::GreyType(_) => ErrorKind::TypeMismatch,
            Error::ParamData(_)
            | Error::DomainData(_)
            | Error::ValuesData(_)
            | Error::NodeNotFound(_)
            | Error::ElementNotFound(_)
            | Error::Serialization(_) => ErrorKind::ParameterData,
            Error::OutOfMemory => ErrorKind::Allocation,
            Error::Unimplemented(_) | Error::InterpolationType(_) => ErrorKind::Unimplemented,
        }
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(Error::ValuesNull.kind(), ErrorKind::NullInput);
        assert_eq!(Error::DomainType("plane").kind(), ErrorKind::TypeMismatch);
        assert_eq!(Error::ParamData("scale".into()).kind(), ErrorKind::ParameterData);
        assert_eq!(Error::OutOfMemory.kind(), ErrorKind::Allocation);
        assert_eq!(Error::Unimplemented("classify").kind(), ErrorKind::Unimplemented);
    }

    #[test]
    fn object_type_message() {
        let e = Error::ObjectType {
            expected: "CMesh2D",
            found: "Polygon",
        };
        assert_eq!(e.to_string(), "object type mismatch: expected CMesh2D, found Polygon");
    }
}
