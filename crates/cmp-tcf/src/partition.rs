//! Legal basis partitioning.
//!
//! A record with both bases appears in both views. The views only borrow the
//! records; enabled state for each basis is tracked elsewhere and never shared.

use serde::Serialize;

use crate::{PurposeRecord, VendorRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalBasis {
    Consent,
    LegitimateInterest,
}

/// Anything that can be split by legal basis.
pub trait LegalBasisRecord {
    fn is_consent(&self) -> bool;
    fn is_legint(&self) -> bool;

    /// Listed records sort ahead of unlisted ones.
    fn is_gvl(&self) -> bool {
        false
    }

    fn has_basis(&self, basis: LegalBasis) -> bool {
        match basis {
            LegalBasis::Consent => self.is_consent(),
            LegalBasis::LegitimateInterest => self.is_legint(),
        }
    }
}

impl LegalBasisRecord for VendorRecord {
    fn is_consent(&self) -> bool {
        self.is_consent
    }

    fn is_legint(&self) -> bool {
        self.is_legint
    }

    fn is_gvl(&self) -> bool {
        self.gvl.is_listed()
    }
}

impl LegalBasisRecord for PurposeRecord {
    fn is_consent(&self) -> bool {
        self.is_consent
    }

    fn is_legint(&self) -> bool {
        self.is_legint
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegalBasisViews<'a, R> {
    pub consent: Vec<&'a R>,
    pub legint: Vec<&'a R>,
}

impl<'a, R> LegalBasisViews<'a, R> {
    pub fn view(&self, basis: LegalBasis) -> &[&'a R] {
        match basis {
            LegalBasis::Consent => &self.consent,
            LegalBasis::LegitimateInterest => &self.legint,
        }
    }
}

fn ordered_view<'a, R: LegalBasisRecord>(records: &'a [R], basis: LegalBasis) -> Vec<&'a R> {
    let mut view: Vec<&R> = records.iter().filter(|r| r.has_basis(basis)).collect();
    // sort_by_key is stable: declaration order survives within each tier.
    view.sort_by_key(|r| !r.is_gvl());
    view
}

/// Split `records` into consent and legitimate-interest views.
///
/// Within each view GVL-listed records come first; ties keep declaration order.
pub fn partition<R: LegalBasisRecord>(records: &[R]) -> LegalBasisViews<'_, R> {
    LegalBasisViews {
        consent: ordered_view(records, LegalBasis::Consent),
        legint: ordered_view(records, LegalBasis::LegitimateInterest),
    }
}
