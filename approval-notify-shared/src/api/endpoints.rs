use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::API_PREFIX;
use crate::domain::UserId;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn enc(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

fn with_user_query(url: &str, user_id: UserId) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}user_id={}", url, sep, enc(&user_id.to_string()))
}

pub fn approval_requests(base: &str, user_id: UserId) -> String {
    with_user_query(
        &base_join(base, &format!("{}/approval_requests", API_PREFIX)),
        user_id,
    )
}

/// Web page where the user acts on the backlog. `page_url` is used verbatim
/// apart from the appended `user_id` parameter.
pub fn approval_page(page_url: &str, user_id: UserId) -> String {
    with_user_query(page_url.trim_end_matches('/'), user_id)
}
