use percent_encoding::percent_decode_str;
use url::Url;

use super::DomainError;

/// Builds the canonical address of a drive.
///
/// Empty `user`/`password` are treated as absent. A non-empty `path` always
/// starts with `/`. Identical inputs always produce the same URL, which is
/// what the drive registry keys on.
pub fn build_url(
    scheme: &str,
    host: &str,
    port: Option<u16>,
    path: Option<&str>,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<Url, DomainError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(DomainError::InvalidAddress(format!(
            "{scheme}://: host must not be empty"
        )));
    }

    let raw = format!("{scheme}://{host}");
    let mut url =
        Url::parse(&raw).map_err(|err| DomainError::InvalidAddress(format!("{raw}: {err}")))?;

    // Anything beyond a bare host (credentials, port or path smuggled into `host`) is rejected.
    let bare_host = url.host_str().is_some_and(|h| !h.is_empty())
        && url.username().is_empty()
        && url.password().is_none()
        && url.port().is_none()
        && matches!(url.path(), "" | "/")
        && url.query().is_none()
        && url.fragment().is_none();
    if !bare_host {
        return Err(DomainError::InvalidAddress(format!("{raw}: invalid host")));
    }

    if let Some(port) = port {
        url.set_port(Some(port))
            .map_err(|_| DomainError::InvalidAddress(format!("{raw}: port not allowed")))?;
    }

    if let Some(user) = user.filter(|user| !user.is_empty()) {
        url.set_username(user)
            .map_err(|_| DomainError::InvalidAddress(format!("{raw}: user not allowed")))?;
    }

    if let Some(password) = password.filter(|password| !password.is_empty()) {
        url.set_password(Some(password))
            .map_err(|_| DomainError::InvalidAddress(format!("{raw}: password not allowed")))?;
    }

    match path.map(str::trim).filter(|path| !path.is_empty()) {
        Some(path) if path.starts_with('/') => url.set_path(path),
        Some(path) => url.set_path(&format!("/{path}")),
        None => {}
    }

    Ok(url)
}

/// Scheme, credentials, host and port of `url`; path, query and fragment dropped.
pub fn base_address(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_path("");
    base.set_query(None);
    base.set_fragment(None);
    base
}

/// Decoded path of `url` relative to `base`, always starting with `/`.
pub fn relative_path(base: &Url, url: &Url) -> String {
    let base_path = base.path().trim_end_matches('/');
    let path = url.path();
    let relative = path
        .strip_prefix(base_path)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(path);

    let decoded = percent_decode_str(relative).decode_utf8_lossy();
    if decoded.starts_with('/') {
        decoded.into_owned()
    } else {
        format!("/{decoded}")
    }
}

/// Removes `segment` from the end of the path of `url` when the path ends with it.
///
/// `segment` may itself span several components (`/export/media`).
pub fn strip_trailing_segment(url: &Url, segment: &str) -> Url {
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.set_fragment(None);

    let segment = segment.trim_matches('/');
    if segment.is_empty() {
        return stripped;
    }

    let decoded = percent_decode_str(url.path()).decode_utf8_lossy();
    let trimmed = decoded.trim_end_matches('/');
    if let Some(parent) = trimmed.strip_suffix(segment) {
        if parent.ends_with('/') {
            stripped.set_path(parent.trim_end_matches('/'));
        }
    }

    stripped
}

/// First non-empty component of a slash separated path.
pub fn first_segment(path: &str) -> &str {
    path.split('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
}
