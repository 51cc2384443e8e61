//! cmp-schemas
//!
//! Wire-level types shared by the consent engine crates:
//! - the region-scoped experience payload (notices + TCF records)
//! - the Global Vendor List snapshot (parsed leniently, never fatal)
//! - the persisted consent record handed to and read back from the host
//!
//! No IO. Parsing takes already-fetched text or JSON values.

mod experience;
mod gvl;
mod preference;
mod validate;

pub use experience::*;
pub use gvl::*;
pub use preference::*;
pub use validate::{validate_experience, ExperienceError, ValidationIssue};
