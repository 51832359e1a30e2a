//! Verify request assembly against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes builder inputs and the effective URL or
//! transport options they must produce. Vectors are shared data so other
//! bindings of the client can be checked against the same cases.

use fanout_core::request::assemble_url;
use fanout_core::{ClientError, OptionKey, OptionValue, Request};
use serde_json::Value;

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let arr = pair.as_array().unwrap();
            (
                arr[0].as_str().unwrap().to_string(),
                arr[1].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// URL assembly
// ---------------------------------------------------------------------------

#[test]
fn url_assembly_vectors() {
    let raw = include_str!("../../test-vectors/url_assembly.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let url = case["url"].as_str().unwrap();
        let params = pairs(&case["params"]);
        let expected = case["expected"].as_str().unwrap();

        assert_eq!(assemble_url(url, &params), expected, "{name}: assemble_url");

        // The builder must agree with the free function.
        let request = Request::builder()
            .with_url(url)
            .with_get_vars(params.clone())
            .build();
        assert_eq!(request.effective_url(), expected, "{name}: builder");
        assert_eq!(
            request.options().get(OptionKey::Url),
            Some(&OptionValue::Text(expected.to_string())),
            "{name}: Url option"
        );
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

#[test]
fn method_option_vectors() {
    let raw = include_str!("../../test-vectors/method_options.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut builder = Request::builder().with_url("http://host.test/");
        if let Some(method) = case["method"].as_str() {
            builder = builder.with_method(method).unwrap();
        }
        if !case["post_vars"].is_null() {
            builder = builder.with_post_vars(pairs(&case["post_vars"]));
        }
        let request = builder.build();
        let options = request.options();
        let expected = &case["expected"];

        assert_eq!(
            request.method().as_str(),
            expected["method"].as_str().unwrap(),
            "{name}: method"
        );
        assert_eq!(
            options.get(OptionKey::Post).and_then(OptionValue::as_bool),
            expected["post"].as_bool(),
            "{name}: Post"
        );
        assert_eq!(
            options.get(OptionKey::CustomRequest).and_then(OptionValue::as_text),
            expected["custom_request"].as_str(),
            "{name}: CustomRequest"
        );
        assert_eq!(
            options.get(OptionKey::NoBody).and_then(OptionValue::as_bool),
            expected["no_body"].as_bool(),
            "{name}: NoBody"
        );
        assert_eq!(
            options.get(OptionKey::PostFields).and_then(OptionValue::as_text),
            expected["post_fields"].as_str(),
            "{name}: PostFields"
        );
    }
}

#[test]
fn invalid_method_vectors() {
    let raw = include_str!("../../test-vectors/invalid_methods.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let method = case.as_str().unwrap();
        match Request::builder().with_method(method) {
            Err(ClientError::InvalidMethod(name)) => assert_eq!(name, method),
            other => panic!("{method:?}: expected InvalidMethod, got {other:?}"),
        }
    }
}
