//! Core data models for the S3-compatible object storage service.
//!
//! These entities represent the logical structure of buckets and objects.
//! They encode to and from the flat CSV rows the metadata store persists.

pub mod bucket;
pub mod object;
