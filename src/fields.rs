use std::borrow::Cow;
use std::sync::Arc;

use crate::backend::{Field, FieldType, OpaquePayload};
use crate::record::{AnyValue, Attr, Value};

/// Upper bound on chained deferred-value resolution, guarding against
/// thunks that keep returning thunks.
const MAX_DEFERRED_RESOLUTIONS: usize = 100;

/// Map one non-group, non-deferred value to its backend payload:
/// (type tag, integer slot, string slot, opaque slot). Exactly one slot is
/// meaningful per tag; the others are zero filler.
///
/// Special encodings:
/// - bool → integer 1/0;
/// - duration → integer nanosecond ticks (saturating at `i64::MAX`);
/// - f64 → integer carries the raw bit pattern, an exact round-trip;
/// - time → integer nanoseconds since epoch, opaque carries the
///   originating offset;
/// - u64 → integer is the bit-identical reinterpretation;
/// - arbitrary values are tagged by capability (stringer / error /
///   reflective fallback) with the value itself in the opaque slot.
pub fn field_payload(value: &Value) -> (FieldType, i64, String, Option<OpaquePayload>) {
    match value {
        Value::Bool(v) => (FieldType::Bool, i64::from(*v), String::new(), None),
        Value::Duration(v) => (
            FieldType::Duration,
            i64::try_from(v.as_nanos()).unwrap_or(i64::MAX),
            String::new(),
            None,
        ),
        Value::Float64(v) => (FieldType::Float64, v.to_bits() as i64, String::new(), None),
        Value::Int64(v) => (FieldType::Int64, *v, String::new(), None),
        Value::String(v) => (FieldType::String, 0, v.clone(), None),
        Value::Time(v) => (
            FieldType::Time,
            v.timestamp_nanos_opt().unwrap_or(0),
            String::new(),
            Some(OpaquePayload::Offset(*v.offset())),
        ),
        Value::Uint64(v) => (FieldType::Uint64, *v as i64, String::new(), None),
        Value::Any(v) => {
            let (ty, payload) = match v {
                AnyValue::Display(inner) => {
                    (FieldType::Stringer, OpaquePayload::Display(Arc::clone(inner)))
                }
                AnyValue::Error(inner) => {
                    (FieldType::Error, OpaquePayload::Error(Arc::clone(inner)))
                }
                AnyValue::Opaque(inner) => {
                    (FieldType::Reflect, OpaquePayload::Debug(Arc::clone(inner)))
                }
            };
            (ty, 0, String::new(), Some(payload))
        }
        Value::Group(_) | Value::Deferred(_) => {
            debug_assert!(false, "group and deferred values must be flattened before mapping");
            (FieldType::Reflect, 0, String::new(), None)
        }
    }
}

/// Flatten `attr` into `out`, prefixing its key with `prefix`.
///
/// Deferred values are resolved first. Non-group values append exactly one
/// field keyed `prefix + key`. Group values append nothing for the group
/// node itself and recurse into the children with the prefix extended by
/// `key + "."`; an empty group key recurses with the prefix unchanged.
/// The traversal is pre-order, so output order matches the record, and
/// recursion depth equals tree depth.
pub fn append_attr(out: &mut Vec<Field>, attr: &Attr, prefix: &str) {
    let value = resolve_value(&attr.value);
    match value.as_ref() {
        Value::Group(children) => {
            let child_prefix = if attr.key.is_empty() {
                Cow::Borrowed(prefix)
            } else {
                Cow::Owned(format!("{}{}.", prefix, attr.key))
            };
            for child in children {
                append_attr(out, child, &child_prefix);
            }
        }
        other => {
            let (ty, integer, string, opaque) = field_payload(other);
            out.push(Field {
                key: format!("{}{}", prefix, attr.key),
                ty,
                integer,
                string,
                opaque,
            });
        }
    }
}

/// Run deferred thunks until a concrete value comes back, bounded by
/// [`MAX_DEFERRED_RESOLUTIONS`]. A chain that never settles is replaced by
/// a marker string rather than looping forever.
fn resolve_value(value: &Value) -> Cow<'_, Value> {
    let Value::Deferred(thunk) = value else {
        return Cow::Borrowed(value);
    };
    let mut current = thunk();
    for _ in 0..MAX_DEFERRED_RESOLUTIONS {
        match current {
            Value::Deferred(thunk) => current = thunk(),
            concrete => return Cow::Owned(concrete),
        }
    }
    Cow::Owned(Value::String("!DEFERRED: resolution limit reached".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use std::time::Duration;

    fn flatten(attrs: &[Attr]) -> Vec<Field> {
        let mut out = Vec::new();
        for attr in attrs {
            append_attr(&mut out, attr, "");
        }
        out
    }

    #[test]
    fn bool_maps_to_one_or_zero() {
        let (ty, integer, string, opaque) = field_payload(&Value::Bool(true));
        assert_eq!(ty, FieldType::Bool);
        assert_eq!(integer, 1);
        assert!(string.is_empty());
        assert!(opaque.is_none());

        let (_, integer, _, _) = field_payload(&Value::Bool(false));
        assert_eq!(integer, 0);
    }

    #[test]
    fn float_payload_is_the_exact_bit_pattern() {
        for v in [0.0, -0.0, 1.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN, f64::MIN_POSITIVE] {
            let (ty, integer, _, _) = field_payload(&Value::Float64(v));
            assert_eq!(ty, FieldType::Float64);
            assert_eq!(f64::from_bits(integer as u64).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn duration_maps_to_nanosecond_ticks() {
        let (ty, integer, _, _) = field_payload(&Value::Duration(Duration::from_micros(7)));
        assert_eq!(ty, FieldType::Duration);
        assert_eq!(integer, 7_000);

        // Out-of-range durations saturate instead of wrapping.
        let (_, integer, _, _) = field_payload(&Value::Duration(Duration::from_secs(u64::MAX)));
        assert_eq!(integer, i64::MAX);
    }

    #[test]
    fn uint64_is_reinterpreted_bit_identically() {
        let (ty, integer, _, _) = field_payload(&Value::Uint64(u64::MAX));
        assert_eq!(ty, FieldType::Uint64);
        assert_eq!(integer as u64, u64::MAX);
    }

    #[test]
    fn time_carries_nanos_and_originating_offset() {
        let offset = FixedOffset::east_opt(3 * 3600).expect("offset");
        let when = offset.with_ymd_and_hms(2023, 4, 5, 6, 7, 8).single().expect("time");
        let (ty, integer, _, opaque) = field_payload(&Value::Time(when));
        assert_eq!(ty, FieldType::Time);
        assert_eq!(integer, when.timestamp_nanos_opt().expect("in range"));
        match opaque {
            Some(OpaquePayload::Offset(o)) => assert_eq!(o, offset),
            other => panic!("unexpected opaque payload: {:?}", other),
        }
    }

    #[test]
    fn any_values_are_tagged_by_capability() {
        let (ty, _, _, opaque) = field_payload(&Value::Any(AnyValue::display("addr:80")));
        assert_eq!(ty, FieldType::Stringer);
        assert!(matches!(opaque, Some(OpaquePayload::Display(_))));

        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let (ty, _, _, opaque) = field_payload(&Value::Any(AnyValue::error(err)));
        assert_eq!(ty, FieldType::Error);
        assert!(matches!(opaque, Some(OpaquePayload::Error(_))));

        let (ty, _, _, opaque) = field_payload(&Value::Any(AnyValue::opaque(vec![1u8, 2])));
        assert_eq!(ty, FieldType::Reflect);
        assert!(matches!(opaque, Some(OpaquePayload::Debug(_))));
    }

    #[test]
    fn groups_flatten_pre_order_with_dotted_keys() {
        let attrs = vec![
            Attr::int64("count", 3),
            Attr::group(
                "http",
                vec![
                    Attr::int64("code", 200),
                    Attr::group("tls", vec![Attr::string("version", "1.3")]),
                    Attr::string("name", "ok"),
                ],
            ),
            Attr::bool("done", true),
        ];
        let fields = flatten(&attrs);
        let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, ["count", "http.code", "http.tls.version", "http.name", "done"]);
    }

    #[test]
    fn group_nodes_emit_no_field_of_their_own() {
        let attrs = vec![Attr::group("outer", vec![Attr::group("inner", vec![])])];
        assert!(flatten(&attrs).is_empty());
    }

    #[test]
    fn unnamed_groups_add_no_prefix_segment() {
        let attrs = vec![Attr::group(
            "req",
            vec![Attr::group("", vec![Attr::string("method", "GET")])],
        )];
        let fields = flatten(&attrs);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].key, "req.method");
    }

    #[test]
    fn deferred_values_resolve_before_mapping() {
        let attrs = vec![Attr::deferred("lazy", || Value::Int64(42))];
        let fields = flatten(&attrs);
        assert_eq!(fields[0].ty, FieldType::Int64);
        assert_eq!(fields[0].integer, 42);
    }

    #[test]
    fn deferred_groups_still_flatten() {
        let attrs = vec![Attr::deferred("g", || {
            Value::Group(vec![Attr::string("k", "v")])
        })];
        let fields = flatten(&attrs);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].key, "g.k");
        assert_eq!(fields[0].string, "v");
    }

    #[test]
    fn runaway_deferred_chains_settle_on_a_marker() {
        fn chain() -> Value {
            Value::Deferred(Arc::new(chain))
        }
        let attrs = vec![Attr::new("spin", chain())];
        let fields = flatten(&attrs);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].ty, FieldType::String);
        assert!(fields[0].string.starts_with("!DEFERRED"));
    }
}
