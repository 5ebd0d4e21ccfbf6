//! Cookie header helpers shared by the session and CSRF stages.

use portico_core::Context;

/// Returns the value of the named cookie from the request, if present.
#[must_use]
pub fn request_cookie(ctx: &Context, name: &str) -> Option<String> {
    let header = ctx.request_header("cookie")?;
    for pair in header.split(';') {
        let pair = pair.trim();
        let mut parts = pair.splitn(2, '=');
        let key = parts.next()?.trim();
        if key == name {
            return Some(parts.next().unwrap_or("").trim().to_string());
        }
    }
    None
}

/// Formats a `Set-Cookie` value scoped to the whole site.
#[must_use]
pub fn build_cookie(name: &str, value: &str, max_age_secs: u64, http_only: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; Max-Age={max_age_secs}; SameSite=Lax");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}
