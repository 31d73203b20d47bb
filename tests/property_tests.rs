//! Property-based tests for the value mapper, the attribute flattener, and
//! the level map.

use proptest::prelude::*;

use logbridge::backend::{FieldType, Severity};
use logbridge::fields::{append_attr, field_payload};
use logbridge::level::{map_level, Level};
use logbridge::record::{Attr, Value};

/// Reference walk producing the keys a pre-order flattening must emit.
fn expected_keys(attrs: &[Attr], prefix: &str, out: &mut Vec<String>) {
    for attr in attrs {
        match &attr.value {
            Value::Group(children) => {
                let child_prefix = if attr.key.is_empty() {
                    prefix.to_string()
                } else {
                    format!("{}{}.", prefix, attr.key)
                };
                expected_keys(children, &child_prefix, out);
            }
            _ => out.push(format!("{}{}", prefix, attr.key)),
        }
    }
}

fn arb_attr() -> impl Strategy<Value = Attr> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int64),
        any::<u64>().prop_map(Value::Uint64),
        any::<f64>().prop_map(Value::Float64),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    let value = leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(
            ("[a-z]{0,6}", inner).prop_map(|(key, value)| Attr::new(key, value)),
            0..4,
        )
        .prop_map(Value::Group)
    });
    ("[a-z]{1,6}", value).prop_map(|(key, value)| Attr::new(key, value))
}

proptest! {
    /// Flattening is an order-preserving pre-order traversal with dot-joined
    /// group prefixes, and group nodes never emit a field of their own.
    #[test]
    fn flattening_is_pre_order_with_dotted_prefixes(
        attrs in prop::collection::vec(arb_attr(), 0..6)
    ) {
        let mut fields = Vec::new();
        for attr in &attrs {
            append_attr(&mut fields, attr, "");
        }

        let mut expected = Vec::new();
        expected_keys(&attrs, "", &mut expected);

        let got: Vec<String> = fields.iter().map(|f| f.key.clone()).collect();
        prop_assert_eq!(got, expected);
    }

    /// The f64 integer payload is the exact bit pattern, NaN and infinities
    /// included.
    #[test]
    fn float_payload_round_trips_bitwise(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        let (ty, integer, _, _) = field_payload(&Value::Float64(v));
        prop_assert_eq!(ty, FieldType::Float64);
        prop_assert_eq!(f64::from_bits(integer as u64).to_bits(), v.to_bits());
    }

    /// Bool payloads are exactly 1 or 0.
    #[test]
    fn bool_payload_is_binary(v in any::<bool>()) {
        let (ty, integer, _, _) = field_payload(&Value::Bool(v));
        prop_assert_eq!(ty, FieldType::Bool);
        prop_assert_eq!(integer, i64::from(v));
    }

    /// Uint64 payloads reinterpret bit-identically.
    #[test]
    fn uint64_payload_is_bit_identical(v in any::<u64>()) {
        let (ty, integer, _, _) = field_payload(&Value::Uint64(v));
        prop_assert_eq!(ty, FieldType::Uint64);
        prop_assert_eq!(integer as u64, v);
    }

    /// Every level outside the seven-entry table maps to the error tier.
    #[test]
    fn unmapped_levels_default_to_error(raw in any::<i16>()) {
        let known = [-4i16, 0, 4, 8, 9, 10, 11];
        prop_assume!(!known.contains(&raw));
        prop_assert_eq!(map_level(Level(raw)), Severity::Error);
    }
}
