//! Remote-locator parsing.
//!
//! Recognizes the remote target forms kustomize accepts and turns them into a
//! [`RemoteLocator`]:
//!
//! - `https://host/org/repo[.git][//sub/path][?ref=REV]` (also `http://`)
//! - `ssh://[user@]host/org/repo[.git][//sub/path][?ref=REV]`
//! - `git@host:org/repo[.git][//sub/path][?ref=REV]`
//! - any of the above behind a `git::` prefix
//! - `github.com/org/repo[/sub/path][?ref=REV]` (also gitlab.com, bitbucket.org)
//!
//! Repository URLs are normalized so equivalent spellings collapse: the host is
//! lower-cased, credentials and the `.git` suffix are dropped, and the
//! shorthand form becomes `https://`.

use crate::constants::SHORTHAND_GIT_HOSTS;
use crate::core::RemoteLocator;
use crate::utils::normalize_repo_path;

const GIT_PREFIX: &str = "git::";
const SUPPORTED_SCHEMES: [&str; 3] = ["https", "http", "ssh"];

/// Returns `true` if `raw` is written in remote-locator syntax.
///
/// This is a purely syntactic check; a `true` result may still fail to parse.
#[must_use]
pub fn is_remote_syntax(raw: &str) -> bool {
    if raw.starts_with(GIT_PREFIX) || raw.contains("://") {
        return true;
    }
    let first = raw.split(['/', '?']).next().unwrap_or_default();
    first.contains('@') || is_shorthand_host(first)
}

fn is_shorthand_host(segment: &str) -> bool {
    SHORTHAND_GIT_HOSTS.iter().any(|h| h.eq_ignore_ascii_case(segment))
}

/// Parses a remote locator, filling in `default_revision` when none is given.
///
/// Errors are returned as a human readable reason; the resolver wraps them into
/// a reference syntax error.
pub fn parse_remote(raw: &str, default_revision: &str) -> Result<RemoteLocator, String> {
    let unprefixed = raw.strip_prefix(GIT_PREFIX).unwrap_or(raw);
    let (location, query) = match unprefixed.split_once('?') {
        Some((location, query)) => (location, Some(query)),
        None => (unprefixed, None),
    };

    let revision = match query {
        Some(query) => parse_revision(query)?.unwrap_or_else(|| default_revision.to_string()),
        None => default_revision.to_string(),
    };

    let (repository, sub_path) = if let Some((scheme, rest)) = location.split_once("://") {
        parse_scheme_url(scheme, rest)?
    } else {
        let first = location.split('/').next().unwrap_or_default();
        if first.contains('@') {
            parse_scp_like(location)?
        } else if is_shorthand_host(first) {
            let host = first.to_ascii_lowercase();
            let path = location[first.len()..].trim_start_matches('/');
            let (repo_path, sub_path) = split_repo_path(&host, path);
            (format!("https://{host}/{}", clean_repo_path(repo_path)?), sub_path)
        } else {
            return Err(format!("'{raw}' is not a recognized remote locator"));
        }
    };

    let path = normalize_repo_path(&sub_path)
        .ok_or_else(|| "sub-path climbs above the repository root".to_string())?;

    Ok(RemoteLocator {
        repository,
        revision,
        path,
    })
}

/// Extracts `ref=`/`version=` from a query string; `timeout=` and
/// `submodules=` are accepted and ignored.
fn parse_revision(query: &str) -> Result<Option<String>, String> {
    let mut revision = None;
    for param in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = param.split_once('=').unwrap_or((param, ""));
        match key {
            "ref" | "version" => {
                if value.is_empty() {
                    return Err(format!("empty '{key}=' value"));
                }
                if value.starts_with('-') {
                    return Err(format!("'{key}=' value must not start with '-'"));
                }
                revision = Some(value.to_string());
            }
            "timeout" | "submodules" => {}
            other => {
                tracing::debug!("Ignoring unknown remote locator parameter '{other}'");
            }
        }
    }
    Ok(revision)
}

fn parse_scheme_url(scheme: &str, rest: &str) -> Result<(String, String), String> {
    let scheme = scheme.to_ascii_lowercase();
    if !SUPPORTED_SCHEMES.contains(&scheme.as_str()) {
        return Err(format!("unsupported scheme '{scheme}://'"));
    }

    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let (user, host) = match authority.rsplit_once('@') {
        Some((user, host)) => (Some(user), host),
        None => (None, authority),
    };
    if host.is_empty() {
        return Err("missing host".to_string());
    }
    let host = host.to_ascii_lowercase();

    let (repo_path, sub_path) = split_repo_path(&host, path);
    let repo_path = clean_repo_path(repo_path)?;

    // http(s) userinfo is a credential; an ssh user name selects the account
    let authority = match (scheme.as_str(), user) {
        ("ssh", Some(user)) if !user.is_empty() => {
            let user = user.split(':').next().unwrap_or(user);
            format!("{user}@{host}")
        }
        _ => host,
    };

    Ok((format!("{scheme}://{authority}/{repo_path}"), sub_path))
}

fn parse_scp_like(location: &str) -> Result<(String, String), String> {
    let Some((user_host, path)) = location.split_once(':') else {
        return Err("scp-like locator is missing ':' between host and path".to_string());
    };
    if user_host.contains('/') {
        return Err("scp-like locator is missing ':' between host and path".to_string());
    }
    let (user, host) = user_host.rsplit_once('@').unwrap_or(("", user_host));
    if host.is_empty() {
        return Err("missing host".to_string());
    }
    let host = host.to_ascii_lowercase();
    let (repo_path, sub_path) = split_repo_path(&host, path);
    let repo_path = clean_repo_path(repo_path)?;

    let repository = if user.is_empty() {
        format!("{host}:{repo_path}")
    } else {
        format!("{user}@{host}:{repo_path}")
    };
    Ok((repository, sub_path))
}

/// Splits a path into repository part and sub-path.
///
/// An explicit `//` separator wins, then a `.git` segment suffix. On the
/// well-known hosts the first two segments are the repository.
fn split_repo_path<'a>(host: &str, path: &'a str) -> (&'a str, String) {
    let path = path.trim_start_matches('/');

    if let Some((repo, sub)) = path.split_once("//") {
        return (repo, sub.to_string());
    }

    if let Some(pos) = path.find(".git/") {
        return (&path[..pos + ".git".len()], path[pos + ".git/".len()..].to_string());
    }

    if is_shorthand_host(host) {
        let mut segments = path.splitn(3, '/');
        let org = segments.next().unwrap_or_default();
        let repo = segments.next().unwrap_or_default();
        let rest = segments.next().unwrap_or_default();
        let repo_len = if repo.is_empty() {
            org.len()
        } else {
            org.len() + 1 + repo.len()
        };
        return (&path[..repo_len], rest.to_string());
    }

    (path, String::new())
}

fn clean_repo_path(repo_path: &str) -> Result<String, String> {
    let trimmed = repo_path.trim_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed).trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("missing repository path".to_string());
    }
    Ok(trimmed.to_string())
}
