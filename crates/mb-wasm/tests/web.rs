#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use mb_wasm::{
    evaluate, export_record, ignore_site, init, install_lists, is_initialized, list_ignored, restore_record,
    sweep_ignored,
};

fn field(obj: &JsValue, key: &str) -> JsValue {
    js_sys::Reflect::get(obj, &key.into()).unwrap()
}

#[wasm_bindgen_test]
fn evaluates_ignores_and_exports() {
    if !is_initialized() {
        init().unwrap();
    }
    install_lists("bad.com\n", "judi\n").unwrap();

    let url = evaluate("sub.bad.com", "", "");
    assert_eq!(field(&url, "reason").as_string().as_deref(), Some("url"));
    assert_eq!(field(&url, "canIgnore").as_bool(), Some(false));

    let word = evaluate("news.example", "Situs Judi", "");
    assert_eq!(field(&word, "reason").as_string().as_deref(), Some("word"));

    ignore_site("news.example").unwrap();
    let after = evaluate("news.example", "Situs Judi", "");
    assert_eq!(field(&after, "blocked").as_bool(), Some(false));

    let listed = js_sys::Array::from(&list_ignored().unwrap());
    assert_eq!(listed.length(), 1);

    let exported = export_record("mojublock_ignored_sites").unwrap().unwrap();
    assert!(exported.contains("news.example"));

    restore_record(
        "mojublock_ignored_sites",
        r#"{"news.example":4102444800000,"stale.example":1}"#,
    )
    .unwrap();
    assert_eq!(sweep_ignored().unwrap(), 1);
    assert_eq!(sweep_ignored().unwrap(), 0);

    let swept = export_record("mojublock_ignored_sites").unwrap().unwrap();
    assert!(swept.contains("news.example"));
    assert!(!swept.contains("stale.example"));
}
