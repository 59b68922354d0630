//! # Domain Model
//!
//! Narrow representations of the cluster objects a rotation touches.
//!
//! The rotation core only ever sees these types; the Kubernetes adapter in
//! [`crate::cluster`] maps them to and from the `k8s-openapi` wire types.

mod pod;
mod secret;

pub use pod::PodRef;
pub use secret::{SealedKeySecret, SecretSet, TypeMeta};
