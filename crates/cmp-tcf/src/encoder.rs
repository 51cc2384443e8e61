//! Seam to the external TC-string library.
//!
//! The engine owns the id sets; bit-level encoding is delegated to whatever
//! [`TcStringEncoder`] the host plugs in.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("tc string encoder rejected input: {0}")]
    Rejected(String),
    #[error("tc string encoder unavailable: {0}")]
    Unavailable(String),
}

/// Numeric id sets handed to the encoder. Each list is sorted and unique.
///
/// Only GVL-listed vendors appear in the vendor lists; unlisted vendors have
/// no TC-string representation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TcfConsentSets {
    pub purposes_consent: Vec<u32>,
    pub purposes_legint: Vec<u32>,
    pub special_features: Vec<u32>,
    pub vendors_consent: Vec<u32>,
    pub vendors_legint: Vec<u32>,
}

impl TcfConsentSets {
    /// Sort and dedup every list in place.
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.purposes_consent,
            &mut self.purposes_legint,
            &mut self.special_features,
            &mut self.vendors_consent,
            &mut self.vendors_legint,
        ] {
            list.sort_unstable();
            list.dedup();
        }
        self
    }
}

/// External vendor-consent-string encoder. Treated as a pure function.
pub trait TcStringEncoder {
    fn encode(&self, sets: &TcfConsentSets) -> Result<String, EncodeError>;
}

/// Call the encoder; a failure is logged and yields `None` rather than
/// blocking persistence of the decision itself.
pub fn encode_tc_string(encoder: &dyn TcStringEncoder, sets: &TcfConsentSets) -> Option<String> {
    match encoder.encode(sets) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "tc string encoding failed; decision persisted without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Joiner;

    impl TcStringEncoder for Joiner {
        fn encode(&self, sets: &TcfConsentSets) -> Result<String, EncodeError> {
            if sets.vendors_consent.is_empty() {
                return Err(EncodeError::Rejected("no vendors".into()));
            }
            Ok(format!("{:?}", sets.vendors_consent))
        }
    }

    #[test]
    fn normalized_sorts_and_dedups() {
        let sets = TcfConsentSets {
            vendors_consent: vec![8, 2, 8],
            ..Default::default()
        }
        .normalized();
        assert_eq!(sets.vendors_consent, vec![2, 8]);
    }

    #[test]
    fn encoder_failure_degrades_to_none() {
        assert!(encode_tc_string(&Joiner, &TcfConsentSets::default()).is_none());
        let sets = TcfConsentSets {
            vendors_consent: vec![2],
            ..Default::default()
        };
        assert_eq!(encode_tc_string(&Joiner, &sets).as_deref(), Some("[2]"));
    }
}
