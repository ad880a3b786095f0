//! Credential persistence in `window.localStorage`

use portal_core::{CoreError, CoreResult, KeyValueStore};
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// [`KeyValueStore`] backed by `localStorage`
///
/// Values are stored as raw strings so the keys stay readable by other
/// front-ends on the same origin. The storage handle is looked up on every
/// call since browser handles cannot be shared across threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    pub fn new() -> Self {
        Self
    }

    /// True when the browser exposes `localStorage` (it may be disabled)
    pub fn is_available() -> bool {
        local_storage().is_ok()
    }
}

fn local_storage() -> CoreResult<Storage> {
    let window = web_sys::window().ok_or_else(|| CoreError::storage("no window object"))?;
    window
        .local_storage()
        .map_err(js_err)?
        .ok_or_else(|| CoreError::storage("localStorage is not available"))
}

fn js_err(value: JsValue) -> CoreError {
    CoreError::storage(format!("{value:?}"))
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        local_storage()?.get_item(key).map_err(js_err)
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        local_storage()?.set_item(key, value).map_err(js_err)
    }

    fn remove_keys(&self, keys: &[&str]) -> CoreResult<()> {
        let storage = local_storage()?;
        for key in keys {
            storage.remove_item(key).map_err(js_err)?;
        }
        Ok(())
    }
}
