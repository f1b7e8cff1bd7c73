//! Key layout of the published namespace.
//!
//! ```text
//! {root}/{protocol}/services/{server}/loadbalancer/servers/0/url
//! {root}/{protocol}/routers/{name}/rule
//! {root}/{protocol}/routers/{name}/service
//! {root}/{protocol}/routers/{name}/entrypoints/{i}
//! {root}/http/routers/{name}/middlewares/{j}
//! ```

use crate::upstream::Protocol;

/// Separator between key segments.
pub const SEPARATOR: char = '/';

/// Marker separating a resource name from its provider (`name@provider`).
pub const PROVIDER_MARKER: char = '@';

/// Name a router is published under.
///
/// Provider-qualified names are rewritten to `{base}_{server}` so that the same
/// router exposed by several servers stays distinct.
pub fn published_name(native: &str, server: &str) -> String {
    match native.split_once(PROVIDER_MARKER) {
        Some((base, _)) => format!("{base}_{server}"),
        None => native.to_string(),
    }
}

/// Builds keys for one protocol under one namespace root.
#[derive(Debug, Clone, Copy)]
pub struct KeyBuilder<'a> {
    root: &'a str,
    protocol: Protocol,
}

impl<'a> KeyBuilder<'a> {
    pub fn new(root: &'a str, protocol: Protocol) -> Self {
        Self { root, protocol }
    }

    pub fn load_balancer_url(&self, service: &str) -> String {
        format!(
            "{}/{}/services/{}/loadbalancer/servers/0/url",
            self.root, self.protocol, service
        )
    }

    pub fn router(&self, router: &str, attribute: &str) -> String {
        format!("{}/{}/routers/{}/{}", self.root, self.protocol, router, attribute)
    }

    pub fn router_item(&self, router: &str, attribute: &str, index: usize) -> String {
        format!(
            "{}/{}/routers/{}/{}/{}",
            self.root, self.protocol, router, attribute, index
        )
    }
}

/// Whether `key` lies inside the namespace rooted at `root`.
pub fn in_namespace(key: &str, root: &str) -> bool {
    key.strip_prefix(root)
        .is_some_and(|rest| rest.starts_with(SEPARATOR) && rest.len() > 1)
}
