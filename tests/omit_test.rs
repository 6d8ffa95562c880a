#![allow(missing_docs)]

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use jsongroup::{marshal, marshal_with_options, GroupObject, Options};
use serde_json::{json, Value};

#[derive(GroupObject, Default)]
struct OmitZeroFixture {
    #[jsongroup(json = "int")]
    pub int: i64,
    #[jsongroup(json = "int_zero,omitzero")]
    pub int_zero: i64,
    #[jsongroup(json = "int_value,omitzero")]
    pub int_value: i64,
    #[jsongroup(json = "float")]
    pub float: f64,
    #[jsongroup(json = "float_zero,omitzero")]
    pub float_zero: f64,
    #[jsongroup(json = "float_value,omitzero")]
    pub float_value: f64,
    #[jsongroup(json = "bool")]
    pub flag: bool,
    #[jsongroup(json = "bool_false,omitzero")]
    pub bool_false: bool,
    #[jsongroup(json = "bool_true,omitzero")]
    pub bool_true: bool,
    #[jsongroup(json = "string")]
    pub string: String,
    #[jsongroup(json = "string_empty,omitzero")]
    pub string_empty: String,
    #[jsongroup(json = "string_value,omitzero")]
    pub string_value: String,
    #[jsongroup(json = "time")]
    pub time: DateTime<Utc>,
    #[jsongroup(json = "time_zero,omitzero")]
    pub time_zero: DateTime<Utc>,
    #[jsongroup(json = "time_value,omitzero")]
    pub time_value: DateTime<Utc>,

    #[jsongroup(json = "slice_empty,omitzero")]
    pub slice_empty: Vec<String>,
    #[jsongroup(json = "slice_with_items,omitzero")]
    pub slice_with_items: Vec<String>,
    #[jsongroup(json = "map_empty,omitzero")]
    pub map_empty: HashMap<String, String>,
    #[jsongroup(json = "map_with_items,omitzero")]
    pub map_with_items: HashMap<String, String>,

    #[jsongroup(json = "ptr_nil,omitzero")]
    pub ptr_nil: Option<Box<String>>,
    #[jsongroup(json = "ptr_value,omitzero")]
    pub ptr_value: Option<Box<String>>,

    #[jsongroup(json = "empty_slice,omitempty")]
    pub empty_slice: Vec<String>,
    #[jsongroup(json = "empty_map,omitempty")]
    pub empty_map: HashMap<String, String>,
    #[jsongroup(json = "empty_string,omitempty")]
    pub empty_string: String,
    #[jsongroup(json = "zero_int,omitempty")]
    pub zero_int: i64,
}

fn keys(bytes: &[u8]) -> Vec<String> {
    let value: Value = serde_json::from_slice(bytes).unwrap();
    value.as_object().unwrap().keys().cloned().collect()
}

#[test]
fn test_omitzero_keeps_empty_collections() {
    let fixture = OmitZeroFixture {
        int_value: 42,
        float_value: 2.5,
        bool_true: true,
        string_value: "value".into(),
        time_value: Utc.with_ymd_and_hms(2024, 4, 20, 12, 0, 0).unwrap(),
        slice_with_items: vec!["item".into()],
        map_with_items: HashMap::from([("key".to_owned(), "value".to_owned())]),
        ptr_value: Some(Box::new("value".into())),
        ..OmitZeroFixture::default()
    };

    let got = keys(&marshal(&fixture, &[]).unwrap());
    let mut expected = vec![
        "int",
        "int_value",
        "float",
        "float_value",
        "bool",
        "bool_true",
        "string",
        "string_value",
        "time",
        "time_value",
        "slice_empty",
        "slice_with_items",
        "map_empty",
        "map_with_items",
        "ptr_value",
    ];
    expected.sort_unstable();
    assert_eq!(got, expected);
}

#[test]
fn test_zero_instant_is_rendered_when_not_omitted() {
    let fixture = OmitZeroFixture::default();
    let value: Value = serde_json::from_slice(&marshal(&fixture, &[]).unwrap()).unwrap();
    assert_eq!(value["time"], "1970-01-01T00:00:00Z");
    assert_eq!(value["slice_empty"], json!([]));
    assert_eq!(value["map_empty"], json!({}));
}

#[derive(GroupObject, Default)]
struct OmitCombined {
    #[jsongroup(json = "int_both,omitempty,omitzero")]
    pub int_both: i32,
    #[jsongroup(json = "int_empty,omitempty")]
    pub int_empty: i32,
    #[jsongroup(json = "int_zero,omitzero")]
    pub int_zero: i32,
    #[jsongroup(json = "slice_empty_both,omitempty,omitzero")]
    pub slice_empty_both: Vec<String>,
    #[jsongroup(json = "slice_empty_only,omitempty")]
    pub slice_empty_only: Vec<String>,
    #[jsongroup(json = "slice_zero_only,omitzero")]
    pub slice_zero_only: Vec<String>,
}

#[test]
fn test_omit_flags_combine_as_or() {
    let got = keys(&marshal(&OmitCombined::default(), &[]).unwrap());
    assert_eq!(got, ["slice_zero_only"]);
}

#[test]
fn test_null_if_empty_overrides_omission() {
    let opts = Options::default().with_null_if_empty(true);
    let bytes = marshal_with_options(&OmitCombined::default(), &opts, &[]).unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        value,
        json!({
            "int_both": null,
            "int_empty": null,
            "int_zero": null,
            "slice_empty_both": null,
            "slice_empty_only": null,
            "slice_zero_only": null,
        })
    );
}

#[test]
fn test_nil_pointer_policies() {
    #[derive(GroupObject)]
    struct Holder {
        #[jsongroup(json = "inner", groups = "public")]
        pub inner: Option<Box<i32>>,
        #[jsongroup(json = "id", groups = "public")]
        pub id: i32,
    }

    let holder = Holder { inner: None, id: 7 };
    assert_eq!(marshal(&holder, &["public"]).unwrap(), br#"{"id":7}"#);

    let keep = Options::default().with_ignore_nil_pointers(false);
    assert_eq!(
        marshal_with_options(&holder, &keep, &["public"]).unwrap(),
        br#"{"id":7}"#
    );

    let nulls = Options::default().with_null_if_empty(true);
    assert_eq!(
        marshal_with_options(&holder, &nulls, &["public"]).unwrap(),
        br#"{"id":7,"inner":null}"#
    );

    // null-if-empty wins over an explicit request to drop nil pointers.
    let both = Options::default()
        .with_null_if_empty(true)
        .with_ignore_nil_pointers(true);
    assert!(!both.ignore_nil_pointers);
}

#[test]
fn test_loaded_options_keep_null_if_empty_precedence() {
    #[derive(GroupObject)]
    struct Holder {
        #[jsongroup(json = "inner", groups = "public")]
        pub inner: Option<Box<i32>>,
        #[jsongroup(json = "id", groups = "public")]
        pub id: i32,
    }

    let holder = Holder { inner: None, id: 7 };

    let loaded: Options = serde_json::from_str(r#"{"null_if_empty":true}"#).unwrap();
    assert_eq!(
        marshal_with_options(&holder, &loaded, &["public"]).unwrap(),
        br#"{"id":7,"inner":null}"#
    );

    let literal = Options {
        null_if_empty: true,
        ignore_nil_pointers: true,
        ..Options::default()
    };
    assert_eq!(
        marshal_with_options(&holder, &literal, &["public"]).unwrap(),
        br#"{"id":7,"inner":null}"#
    );
}
