//! # Metadata Sanitizer
//!
//! Strips cluster-assigned metadata from a key secret before export so the backup
//! is reproducible and can be re-applied to any cluster.

use crate::constants::{SECRET_API_VERSION, SECRET_KIND};
use crate::model::{SealedKeySecret, TypeMeta};

/// Return a copy of `secret` ready for export
///
/// Clears creation timestamp, resource version, self link and UID, and restores the
/// `v1`/`Secret` type descriptor the API server drops on reads. Labels, annotations,
/// type and data are kept as they are.
pub fn sanitize(secret: &SealedKeySecret) -> SealedKeySecret {
    SealedKeySecret {
        type_meta: Some(TypeMeta {
            api_version: SECRET_API_VERSION.to_string(),
            kind: SECRET_KIND.to_string(),
        }),
        creation_timestamp: None,
        resource_version: None,
        uid: None,
        self_link: None,
        ..secret.clone()
    }
}
