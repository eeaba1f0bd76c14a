//! WebAssembly bindings for MoJuBlock
//!
//! The extension's content script scrapes the page and calls `evaluate`;
//! its service worker owns persistence and mirrors records in and out with
//! `restore_record` / `export_record` under the keys in `mb_core::types::keys`.

use std::sync::{Arc, OnceLock};

use wasm_bindgen::prelude::*;

use mb_core::types::keys;
use mb_core::{
    BlockReason, Blocker, Clock, KeyValueStore, MemoryStore, PageContent, PageMetadata, Verdict,
};

struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

struct BlockerState {
    store: Arc<MemoryStore>,
    blocker: Blocker,
}

static BLOCKER_STATE: OnceLock<BlockerState> = OnceLock::new();

fn state() -> Result<&'static BlockerState, JsValue> {
    BLOCKER_STATE
        .get()
        .ok_or_else(|| JsValue::from_str("Not initialized. Call init() first."))
}

fn to_js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn set(obj: &js_sys::Object, key: &str, value: JsValue) {
    let _ = js_sys::Reflect::set(obj, &key.into(), &value);
}

#[wasm_bindgen]
pub fn init() -> Result<(), JsValue> {
    if BLOCKER_STATE.get().is_some() {
        return Err(JsValue::from_str("Already initialized. Reload the extension to reinitialize."));
    }

    let store = Arc::new(MemoryStore::new());
    let blocker = Blocker::new(store.clone(), Arc::new(JsClock));

    BLOCKER_STATE
        .set(BlockerState { store, blocker })
        .map_err(|_| JsValue::from_str("Failed to set blocker state"))
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    BLOCKER_STATE.get().is_some()
}

// =============================================================================
// Persistence bridge
// =============================================================================

/// Load a persisted record (JSON text) into the engine.
#[wasm_bindgen]
pub fn restore_record(key: &str, value: &str) -> Result<(), JsValue> {
    let state = state()?;
    serde_json::from_str::<serde_json::Value>(value)
        .map_err(|e| JsValue::from_str(&format!("Record '{}' is not valid JSON: {}", key, e)))?;
    state.store.set(key, value).map_err(to_js_err)?;
    if key == keys::BLOCKLIST {
        state.blocker.blocklist().reload();
    }
    Ok(())
}

/// Current JSON text of a record, for the host to persist.
#[wasm_bindgen]
pub fn export_record(key: &str) -> Result<Option<String>, JsValue> {
    state()?.store.get(key).map_err(to_js_err)
}

// =============================================================================
// Blocklists
// =============================================================================

/// Install freshly fetched list text as the new snapshot.
#[wasm_bindgen]
pub fn install_lists(url_text: &str, word_text: &str) -> Result<JsValue, JsValue> {
    let report = state()?
        .blocker
        .blocklist()
        .install(url_text, word_text)
        .map_err(to_js_err)?;

    let result = js_sys::Object::new();
    set(&result, "urlCount", JsValue::from(report.url_stats.entries as u32));
    set(&result, "wordCount", JsValue::from(report.word_stats.entries as u32));
    set(&result, "rejectedPatterns", JsValue::from(report.rejected_patterns as u32));
    set(&result, "lastUpdateTime", JsValue::from(report.last_update_time as f64));
    Ok(result.into())
}

#[wasm_bindgen]
pub fn get_stats() -> Result<JsValue, JsValue> {
    let stats = state()?.blocker.stats().map_err(to_js_err)?;

    let result = js_sys::Object::new();
    set(&result, "urlCount", JsValue::from(stats.url_count as u32));
    set(&result, "wordCount", JsValue::from(stats.word_count as u32));
    set(&result, "rejectedPatterns", JsValue::from(stats.rejected_patterns as u32));
    set(
        &result,
        "lastUpdateTime",
        stats
            .last_update_time
            .map(|t| JsValue::from(t as f64))
            .unwrap_or(JsValue::NULL),
    );
    set(&result, "ignoredCount", JsValue::from(stats.ignored_count as u32));
    set(&result, "reportCount", JsValue::from(stats.report_count as u32));
    Ok(result.into())
}

// =============================================================================
// Evaluation
// =============================================================================

fn verdict_to_js(verdict: Verdict, hostname: &str) -> JsValue {
    let result = js_sys::Object::new();
    set(&result, "blocked", JsValue::from(verdict.blocked));
    set(
        &result,
        "reason",
        verdict
            .reason
            .map(|r| JsValue::from_str(r.as_str()))
            .unwrap_or(JsValue::NULL),
    );
    set(&result, "canIgnore", JsValue::from(verdict.can_ignore()));
    if let Some(message) = verdict.message(hostname) {
        set(&result, "message", JsValue::from_str(&message));
    }
    result.into()
}

/// Evaluate a page. Never throws: any failure allows the page.
#[wasm_bindgen]
pub fn evaluate(hostname: &str, title: &str, page_text: &str) -> JsValue {
    let verdict = match state() {
        Ok(state) => state
            .blocker
            .evaluate_or_allow(&PageContent::new(hostname, title, page_text)),
        Err(_) => Verdict::ALLOW,
    };
    verdict_to_js(verdict, hostname)
}

/// Evaluate scraped metadata given as JSON
/// (`{hostname, title, meta: [{name, content}], headings, spans}`).
#[wasm_bindgen]
pub fn evaluate_metadata(metadata_json: &str) -> JsValue {
    let metadata: PageMetadata = match serde_json::from_str(metadata_json) {
        Ok(metadata) => metadata,
        Err(e) => {
            web_sys::console::warn_1(&JsValue::from_str(&format!("[MoJuBlock] Bad page metadata: {}", e)));
            return verdict_to_js(Verdict::ALLOW, "");
        }
    };
    let content = metadata.into_content();
    let verdict = match state() {
        Ok(state) => state.blocker.evaluate_or_allow(&content),
        Err(_) => Verdict::ALLOW,
    };
    verdict_to_js(verdict, &content.hostname)
}

// =============================================================================
// User actions
// =============================================================================

/// Returns the expiry (epoch millis).
#[wasm_bindgen]
pub fn ignore_site(hostname: &str) -> Result<f64, JsValue> {
    let expiry = state()?.blocker.ignore_site(hostname).map_err(to_js_err)?;
    Ok(expiry as f64)
}

#[wasm_bindgen]
pub fn remove_ignored(hostname: &str) -> Result<bool, JsValue> {
    state()?.blocker.remove_ignored(hostname).map_err(to_js_err)
}

/// Purge expired ignore entries; returns how many were removed.
/// Lookups never write, so the host calls this from its periodic alarm.
#[wasm_bindgen]
pub fn sweep_ignored() -> Result<u32, JsValue> {
    let removed = state()?.blocker.sweep_ignored().map_err(to_js_err)?;
    Ok(removed as u32)
}

#[wasm_bindgen]
pub fn list_ignored() -> Result<JsValue, JsValue> {
    let entries = state()?.blocker.list_ignored().map_err(to_js_err)?;
    let list = js_sys::Array::new_with_length(entries.len() as u32);
    for (i, entry) in entries.iter().enumerate() {
        let item = js_sys::Object::new();
        set(&item, "hostname", JsValue::from_str(&entry.hostname));
        set(&item, "expiry", JsValue::from(entry.expiry as f64));
        list.set(i as u32, item.into());
    }
    Ok(list.into())
}

#[wasm_bindgen]
pub fn report_link(hostname: &str, title: &str, reason: &str, user_agent: &str) -> Result<(), JsValue> {
    let reason = BlockReason::parse(reason)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown reason '{}'", reason)))?;
    state()?
        .blocker
        .report_link(hostname, title, reason, user_agent)
        .map(|_| ())
        .map_err(to_js_err)
}
