//! Browser tests, run with `wasm-pack test --headless --firefox`

#![cfg(target_arch = "wasm32")]

use portal_core::{CredentialStore, Credentials, KeyValueStore, keys};
use portal_frontend_common::{LocalStorageStore, browser_client};
use portal_http::ClientConfig;
use std::sync::Arc;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn test_local_storage_uses_raw_values() {
    let store = LocalStorageStore::new();
    store.remove_keys(&keys::ALL).unwrap();

    let credentials = CredentialStore::new(Arc::new(store));
    credentials
        .save_login(&Credentials::issued_now("T1", Some("R1".into()), None), None)
        .unwrap();

    // Stored unquoted, as other front-ends read them
    assert_eq!(store.get(keys::TOKEN).unwrap().as_deref(), Some("T1"));
    assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap().as_deref(), Some("R1"));

    credentials.clear().unwrap();
    assert!(store.get(keys::TOKEN).unwrap().is_none());
    assert!(!credentials.is_authenticated());
}

#[wasm_bindgen_test]
fn test_browser_client_defaults_to_origin() {
    let client = browser_client(ClientConfig::new("/api/admin-center")).unwrap();
    assert!(client.base_url().starts_with("http"));
    assert!(client.base_url().ends_with("/api/admin-center"));
}
