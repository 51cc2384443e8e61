//! cmp-tcf
//!
//! IAB TCF record handling:
//! - GVL merge: experience vendor declarations + optional GVL snapshot
//! - purpose merge across the consent / legitimate-interest lists
//! - legal basis partitioning with GVL-first stable ordering
//! - storage disclosure text and GVL data categories
//! - the TC-string encoder seam (the encoder itself is external)
//!
//! Deterministic, pure logic. No IO.

mod disclosure;
mod encoder;
mod partition;
mod purposes;
mod vendors;

pub use disclosure::storage_disclosure;
pub use encoder::{encode_tc_string, EncodeError, TcStringEncoder, TcfConsentSets};
pub use partition::{partition, LegalBasis, LegalBasisRecord, LegalBasisViews};
pub use purposes::{merge_purpose_records, PurposeRecord};
pub use vendors::{
    data_categories, merge_vendor_records, DataCategory, GvlStatus, StorageUsage, VendorRecord,
};
