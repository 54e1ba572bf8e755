//! Structural merge of caller-supplied overrides onto a generated document.
//!
//! The merge is total: any overlay value is accepted at any position.
//! Dictionaries merge key by key, everything else (scalars, arrays, and
//! values whose type differs from the base) is replaced by the overlay.

use crate::models::{ConfigDocument, DocumentError};
use plist::Value;

/// Merge `overlay` into `base` in place.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Dictionary(base_dict), Value::Dictionary(overlay_dict)) => {
            for (key, value) in overlay_dict {
                match base_dict.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_dict.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply an override tree to a document and re-check the result against the
/// typed schema.
///
/// Overrides that produce an unreadable document (a string where a boolean
/// quirk belongs, say) fail with [`DocumentError::InvalidOverride`] and leave
/// the input untouched.
pub fn apply_override(doc: &ConfigDocument, overlay: Value) -> Result<ConfigDocument, DocumentError> {
    let mut tree = doc.to_value()?;
    merge_values(&mut tree, overlay);
    let merged = ConfigDocument::from_value(&tree)?;
    tracing::debug!("Applied config override");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plist::Dictionary;
    use proptest::prelude::*;

    fn dict(entries: Vec<(&str, Value)>) -> Value {
        let mut d = Dictionary::new();
        for (k, v) in entries {
            d.insert(k.to_string(), v);
        }
        Value::Dictionary(d)
    }

    #[test]
    fn test_scalars_overridden() {
        let mut base = dict(vec![("Timeout", Value::Integer(5.into()))]);
        merge_values(&mut base, dict(vec![("Timeout", Value::Integer(0.into()))]));
        assert_eq!(base, dict(vec![("Timeout", Value::Integer(0.into()))]));
    }

    #[test]
    fn test_nested_dictionaries_merged() {
        let mut base = dict(vec![(
            "Quirks",
            dict(vec![
                ("A", Value::Boolean(true)),
                ("B", Value::Boolean(false)),
            ]),
        )]);
        let overlay = dict(vec![(
            "Quirks",
            dict(vec![("B", Value::Boolean(true)), ("C", Value::Boolean(true))]),
        )]);

        merge_values(&mut base, overlay);

        assert_eq!(
            base,
            dict(vec![(
                "Quirks",
                dict(vec![
                    ("A", Value::Boolean(true)),
                    ("B", Value::Boolean(true)),
                    ("C", Value::Boolean(true)),
                ]),
            )])
        );
    }

    #[test]
    fn test_arrays_replaced() {
        let mut base = dict(vec![(
            "Add",
            Value::Array(vec![Value::String("a".into()), Value::String("b".into())]),
        )]);
        merge_values(
            &mut base,
            dict(vec![("Add", Value::Array(vec![Value::String("c".into())]))]),
        );
        assert_eq!(
            base,
            dict(vec![("Add", Value::Array(vec![Value::String("c".into())]))])
        );
    }

    #[test]
    fn test_type_mismatch_takes_override() {
        let mut base = dict(vec![("Key", dict(vec![("Inner", Value::Boolean(true))]))]);
        merge_values(&mut base, dict(vec![("Key", Value::String("flat".into()))]));
        assert_eq!(base, dict(vec![("Key", Value::String("flat".into()))]));
    }

    #[test]
    fn test_apply_override_rejects_schema_violation() {
        let doc = ConfigDocument::default();
        let overlay = dict(vec![(
            "Kernel",
            dict(vec![(
                "Quirks",
                dict(vec![("AppleCpuPmCfgLock", Value::String("yes".into()))]),
            )]),
        )]);
        assert!(matches!(
            apply_override(&doc, overlay),
            Err(DocumentError::InvalidOverride(_))
        ));
    }

    #[test]
    fn test_apply_override_flips_quirk() {
        let doc = ConfigDocument::default();
        let overlay = dict(vec![(
            "Kernel",
            dict(vec![(
                "Quirks",
                dict(vec![("AppleCpuPmCfgLock", Value::Boolean(true))]),
            )]),
        )]);
        let merged = apply_override(&doc, overlay).unwrap();
        assert!(merged.kernel.quirks.apple_cpu_pm_cfg_lock);
        assert!(!merged.kernel.quirks.apple_xcpm_cfg_lock);
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Boolean),
            any::<i32>().prop_map(|i| Value::Integer(i64::from(i).into())),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    fn flat_dict() -> impl Strategy<Value = Dictionary> {
        proptest::collection::vec(("[A-E]", scalar()), 0..6).prop_map(|entries| {
            let mut d = Dictionary::new();
            for (k, v) in entries {
                d.insert(k, v);
            }
            d
        })
    }

    proptest! {
        #[test]
        fn prop_overlay_keys_win_and_base_keys_survive(base in flat_dict(), overlay in flat_dict()) {
            let mut merged = Value::Dictionary(base.clone());
            merge_values(&mut merged, Value::Dictionary(overlay.clone()));
            let merged = merged.into_dictionary().unwrap();

            for (key, value) in overlay.iter() {
                prop_assert_eq!(merged.get(key), Some(value));
            }
            for (key, value) in base.iter() {
                if overlay.get(key).is_none() {
                    prop_assert_eq!(merged.get(key), Some(value));
                }
            }
        }

        #[test]
        fn prop_empty_overlay_is_identity(base in flat_dict()) {
            let mut merged = Value::Dictionary(base.clone());
            merge_values(&mut merged, Value::Dictionary(Dictionary::new()));
            prop_assert_eq!(merged, Value::Dictionary(base));
        }
    }
}
