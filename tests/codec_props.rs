use proptest::prelude::*;

use jotter::store::codec::{decode, encode, is_encoded, PROPS_DELIMITER};
use jotter::store::types::is_reserved;
use jotter::store::{Properties, PropertyValue};

fn property_value() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        Just(PropertyValue::Null),
        any::<bool>().prop_map(PropertyValue::Bool),
        any::<i64>().prop_map(PropertyValue::Int),
        any::<f64>().prop_map(PropertyValue::Float),
        ".{0,40}".prop_map(PropertyValue::Text),
        // Date-looking values take the reformatting path.
        "20[0-9]{2}-(0[1-9]|1[0-2])-(0[1-9]|1[0-9]|2[0-8])".prop_map(PropertyValue::Text),
    ]
}

fn properties() -> impl Strategy<Value = Properties> {
    prop::collection::btree_map("(due|date|created|[a-z_]{1,12})", property_value(), 0..8)
}

fn content() -> impl Strategy<Value = String> {
    any::<String>().prop_filter("content must not contain the delimiter", |c| {
        !c.contains(PROPS_DELIMITER)
    })
}

proptest! {
    #[test]
    fn decode_inverts_encode(c in content(), p in properties()) {
        let encoded = encode(&c, Some(&p));
        prop_assert_eq!(decode(&encoded), c.as_str());
    }

    #[test]
    fn encoding_is_marked_only_when_something_was_added(c in content(), p in properties()) {
        let encoded = encode(&c, Some(&p));
        let has_user_props = p.keys().any(|k| !is_reserved(k));
        prop_assert_eq!(is_encoded(&encoded), has_user_props);
        if !has_user_props {
            prop_assert_eq!(encoded, c);
        }
    }

    #[test]
    fn no_properties_is_identity(c in content()) {
        prop_assert_eq!(encode(&c, None), c.clone());
        prop_assert_eq!(decode(&c), c.as_str());
    }
}
