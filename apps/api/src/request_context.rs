use std::net::SocketAddr;

use axum::http::HeaderMap;
use bastion_application::CallerContext;

/// Reads the caller address and user agent used for auditing and fallback
/// attempt keys.
///
/// The address is the socket peer. The first `x-forwarded-for` hop replaces
/// it only when `trust_forwarded_for` is set, which is only safe behind a
/// proxy that overwrites the header.
pub fn caller_context(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> CallerContext {
    let forwarded = trust_forwarded_for
        .then(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned)
        })
        .flatten();
    let ip_address = forwarded.or_else(|| peer.map(|peer| peer.ip().to_string()));

    let user_agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    CallerContext {
        ip_address,
        user_agent,
    }
}

/// Extracts the token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
