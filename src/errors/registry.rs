use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::codes::{ErrorCategory, ErrorDefinition, ErrorKey};

/// Startup validation and lookup failures for the error registry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown error key: {0}")]
    UnknownKey(String),

    #[error("{0} is listed twice")]
    DuplicateKey(ErrorKey),

    #[error("{key}: code {code} is outside the {category:?} band {low}..={high}")]
    CodeOutOfBand {
        key: ErrorKey,
        code: u32,
        category: ErrorCategory,
        low: u32,
        high: u32,
    },

    #[error("{key}: code {code} is already used by {other}")]
    DuplicateCode {
        key: ErrorKey,
        other: ErrorKey,
        code: u32,
    },

    #[error("{key}: code {code} is the reserved category base")]
    ReservedCode { key: ErrorKey, code: u32 },

    #[error("{key}: HTTP status {status} is not an error status")]
    InvalidStatus { key: ErrorKey, status: u16 },

    #[error("{key}: sub-code name {name} is declared twice")]
    DuplicateSubCode { key: ErrorKey, name: &'static str },

    #[error("categories {0:?} and {1:?} have overlapping code bands")]
    OverlappingBands(ErrorCategory, ErrorCategory),
}

/// Proof that the static definition table passed validation.
///
/// Built once at startup and shared by reference. Definitions are served
/// straight from the table that was checked, so lookups never fail.
#[derive(Debug, Clone)]
pub struct ErrorRegistry {
    keys: &'static [ErrorKey],
}

impl ErrorRegistry {
    /// Validate the static definition table
    pub fn load() -> Result<Self, RegistryError> {
        validate(ErrorKey::ALL.iter().map(|key| (*key, key.definition())))?;
        Ok(Self {
            keys: &ErrorKey::ALL,
        })
    }

    /// Definition for a key
    pub fn definition_of(&self, key: ErrorKey) -> &'static ErrorDefinition {
        key.definition()
    }

    /// Resolve a textual key such as `"RESOURCE_NOT_FOUND"`
    pub fn lookup(&self, name: &str) -> Result<ErrorKey, RegistryError> {
        name.parse::<ErrorKey>()
            .ok()
            .filter(|key| self.keys.contains(key))
            .ok_or_else(|| RegistryError::UnknownKey(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn validate(
    entries: impl IntoIterator<Item = (ErrorKey, &'static ErrorDefinition)>,
) -> Result<(), RegistryError> {
    validate_bands()?;

    let mut codes: HashMap<u32, ErrorKey> = HashMap::new();
    let mut seen = HashSet::new();

    for (key, def) in entries {
        if !seen.insert(key) {
            return Err(RegistryError::DuplicateKey(key));
        }

        let (low, high) = def.category.band();
        if def.code < low || def.code > high {
            return Err(RegistryError::CodeOutOfBand {
                key,
                code: def.code,
                category: def.category,
                low,
                high,
            });
        }
        if def.code == low {
            return Err(RegistryError::ReservedCode { key, code: def.code });
        }
        if !(400..=599).contains(&def.http_status) {
            return Err(RegistryError::InvalidStatus {
                key,
                status: def.http_status,
            });
        }
        if let Some(other) = codes.insert(def.code, key) {
            return Err(RegistryError::DuplicateCode {
                key,
                other,
                code: def.code,
            });
        }

        let mut names = HashSet::new();
        for &(name, _) in def.sub_codes {
            if !names.insert(name) {
                return Err(RegistryError::DuplicateSubCode { key, name });
            }
        }
    }

    Ok(())
}

fn validate_bands() -> Result<(), RegistryError> {
    for (i, a) in ErrorCategory::ALL.iter().enumerate() {
        for b in ErrorCategory::ALL.iter().skip(i + 1) {
            let (a_low, a_high) = a.band();
            let (b_low, b_high) = b.band();
            if a_low <= b_high && b_low <= a_high {
                return Err(RegistryError::OverlappingBands(*a, *b));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    static BAD_BAND: ErrorDefinition = ErrorDefinition {
        category: ErrorCategory::Auth,
        code: 3001,
        http_status: 401,
        message: "misfiled",
        logging: true,
        user_friendly: false,
        sub_codes: &[],
    };

    static BAD_STATUS: ErrorDefinition = ErrorDefinition {
        category: ErrorCategory::Auth,
        code: 2001,
        http_status: 200,
        message: "not an error",
        logging: true,
        user_friendly: false,
        sub_codes: &[],
    };

    static REPEATED_SUB_CODE: ErrorDefinition = ErrorDefinition {
        category: ErrorCategory::Business,
        code: 5001,
        http_status: 400,
        message: "repeated",
        logging: true,
        user_friendly: false,
        sub_codes: &[("SAME", 1), ("SAME", 2)],
    };

    #[test]
    fn test_load_accepts_every_declared_key() {
        let registry = ErrorRegistry::load().unwrap();
        assert_eq!(registry.len(), ErrorKey::ALL.len());
        for key in ErrorKey::ALL {
            assert_eq!(registry.definition_of(key), key.definition());
        }
    }

    #[test]
    fn test_codes_stay_inside_their_band() {
        let registry = ErrorRegistry::load().unwrap();
        for key in ErrorKey::ALL {
            let def = registry.definition_of(key);
            let (low, high) = def.category.band();
            assert!(def.code > low && def.code <= high, "{key} escapes its band");
        }
    }

    #[test]
    fn test_category_bands_are_disjoint() {
        assert_eq!(validate_bands(), Ok(()));
    }

    #[test]
    fn test_rejects_code_outside_band() {
        let err = validate([(ErrorKey::Unauthorized, &BAD_BAND)]).unwrap_err();
        assert!(matches!(err, RegistryError::CodeOutOfBand { code: 3001, .. }));
    }

    #[test]
    fn test_rejects_duplicate_code() {
        let err = validate([
            (ErrorKey::Unauthorized, ErrorKey::Unauthorized.definition()),
            (ErrorKey::TokenExpired, ErrorKey::Unauthorized.definition()),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateCode {
                key: ErrorKey::TokenExpired,
                other: ErrorKey::Unauthorized,
                code: 2001,
            }
        );
    }

    #[test]
    fn test_rejects_repeated_key() {
        let err = validate([
            (ErrorKey::Forbidden, ErrorKey::Forbidden.definition()),
            (ErrorKey::Forbidden, ErrorKey::Forbidden.definition()),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateKey(ErrorKey::Forbidden));
    }

    #[test]
    fn test_every_validated_key_resolves_by_name() {
        let registry = ErrorRegistry::load().unwrap();
        for key in ErrorKey::ALL {
            assert_eq!(registry.lookup(key.as_str()), Ok(key));
        }
    }

    #[test]
    fn test_rejects_non_error_status() {
        let err = validate([(ErrorKey::Unauthorized, &BAD_STATUS)]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidStatus { status: 200, .. }));
    }

    #[test]
    fn test_rejects_repeated_sub_code_name() {
        let err = validate([(ErrorKey::InsufficientFunds, &REPEATED_SUB_CODE)])
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateSubCode { name: "SAME", .. }));
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = ErrorRegistry::load().unwrap();
        assert_eq!(registry.lookup("DUPLICATE_ENTRY"), Ok(ErrorKey::DuplicateEntry));
        assert_eq!(
            registry.lookup("INVALID_COUPON"),
            Err(RegistryError::UnknownKey("INVALID_COUPON".to_string()))
        );
    }
}
