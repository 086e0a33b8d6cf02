//! CLI token handlers for set, status, and clear.

use crate::auth::TokenStore;

use super::SetTokensArgs;

/// Handle `belay tokens set`.
pub fn handle_set(store: &dyn TokenStore, args: &SetTokensArgs) {
    store.set_tokens(
        &args.access,
        &args.refresh,
        args.access_ttl_days,
        args.refresh_ttl_days,
    );
    println!("✅ Tokens stored");
}

/// Handle `belay tokens status`.
pub fn handle_status(store: &dyn TokenStore) {
    println!("Token status:\n");
    for (label, token) in [
        ("access ", store.access_token()),
        ("refresh", store.refresh_token()),
    ] {
        match token {
            Some(token) => println!("  ✅ {label}  {}", mask(&token)),
            None => println!("  ❌ {label}  not stored"),
        }
    }
}

/// Handle `belay tokens clear`.
pub fn handle_clear(store: &dyn TokenStore) {
    store.remove_tokens();
    println!("✅ Tokens cleared");
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if visible.len() == token.len() {
        "****".to_string()
    } else {
        format!("{visible}…")
    }
}
