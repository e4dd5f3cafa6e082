//! Document ingestion for the broking portal.
//!
//! Uploads come in as buffered files and leave as a routed, pre-filled
//! workflow entry: hash and store the binaries, run one extraction call
//! for the whole batch, normalize the returned labels onto canonical
//! field keys, and decide which transaction the documents drive.

pub mod blob_store;
pub mod error;
pub mod extraction;
pub mod identity;
pub mod normalize;
pub mod pipeline;
pub mod router;

pub use blob_store::{BlobMetadata, BlobStore, BlobStoreError, InMemoryBlobStore, LocalBlobStore};
pub use error::IngestError;
pub use extraction::{
    Classification, ExtractionResponse, Extractor, FilePayload, HttpExtractor, StaticExtractor,
};
pub use identity::{content_sha256, sanitize_file_name, storage_key, stored_file_name};
pub use normalize::{canonical_key, clean_amount, normalize_fields};
pub use pipeline::{
    ExtractionFallback, IngestOutcome, IngestPipeline, MetadataSink, SinkError,
};
pub use router::{route, sniff_kind, RoutingDecision};
