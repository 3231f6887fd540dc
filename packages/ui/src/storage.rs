//! Where the bearer token survives a reload: `localStorage` in the browser,
//! process memory elsewhere.

const TOKEN_KEY: &str = "circles.token";

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

#[cfg(target_arch = "wasm32")]
pub fn load_token() -> Option<String> {
    local_storage()?
        .get_item(TOKEN_KEY)
        .ok()
        .flatten()
        .filter(|token| !token.is_empty())
}

#[cfg(target_arch = "wasm32")]
pub fn save_token(token: &str) {
    if let Some(storage) = local_storage() {
        if storage.set_item(TOKEN_KEY, token).is_err() {
            web_sys::console::warn_1(&"could not persist session token".into());
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub fn clear_token() {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(TOKEN_KEY);
    }
}

#[cfg(not(target_arch = "wasm32"))]
thread_local! {
    static TOKENS: std::cell::RefCell<std::collections::HashMap<&'static str, String>> =
        std::cell::RefCell::new(std::collections::HashMap::new());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_token() -> Option<String> {
    TOKENS.with(|tokens| tokens.borrow().get(TOKEN_KEY).cloned())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn save_token(token: &str) {
    TOKENS.with(|tokens| {
        tokens.borrow_mut().insert(TOKEN_KEY, token.to_string());
    });
}

#[cfg(not(target_arch = "wasm32"))]
pub fn clear_token() {
    TOKENS.with(|tokens| {
        tokens.borrow_mut().remove(TOKEN_KEY);
    });
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        assert_eq!(load_token(), None);
        save_token("abc");
        assert_eq!(load_token().as_deref(), Some("abc"));
        clear_token();
        assert_eq!(load_token(), None);
    }
}
