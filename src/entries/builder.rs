//! Translation of one server's router inventory into flat entries.
//!
//! # Responsibilities
//! - Publish a load-balancer target pointing at the server's destination
//! - Rename provider-qualified routers to stay unique across servers
//! - Translate local entry points to the global names they map to
//! - Optionally forward middlewares and services (HTTP only)
//!
//! # Design Decisions
//! - A router is exposed only if at least one entry point translates; an
//!   unexposed router contributes no keys at all
//! - Array indices count emitted items only, so skipped items leave no gaps

use std::collections::HashSet;

use crate::config::ServerConfig;
use crate::entries::keys::{published_name, KeyBuilder};
use crate::entries::Snapshot;
use crate::upstream::{Protocol, RouterRecord};

/// What a server exposed for one protocol during a cycle.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub routers: Vec<RouterRecord>,
    /// Middleware names discovered on the server.
    pub middlewares: HashSet<String>,
    /// Service names discovered on the server.
    pub services: HashSet<String>,
}

/// Forwarding flags resolved for one server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardPolicy {
    pub middlewares: bool,
    pub services: bool,
}

/// Builds snapshot fragments under a fixed namespace root.
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    root: String,
}

impl EntryBuilder {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Build the fragment `server` contributes for `protocol`.
    pub fn build(
        &self,
        server: &ServerConfig,
        protocol: Protocol,
        inventory: &Inventory,
        policy: ForwardPolicy,
    ) -> Snapshot {
        let mut entries = Snapshot::new();

        if inventory.routers.is_empty() {
            return entries;
        }

        let keys = KeyBuilder::new(&self.root, protocol);

        entries.insert(
            keys.load_balancer_url(&server.name),
            server.destination_address.clone(),
        );

        for router in &inventory.routers {
            let name = published_name(&router.name, &server.name);

            let entry_points = translate_entry_points(server, router);
            if entry_points.is_empty() {
                tracing::debug!(
                    server = %server.name,
                    router = %router.name,
                    %protocol,
                    "Router not attached to any mapped entry point, skipping"
                );
                continue;
            }

            for (i, global) in entry_points.into_iter().enumerate() {
                entries.insert(keys.router_item(&name, "entrypoints", i), global.to_string());
            }

            entries.insert(keys.router(&name, "rule"), router.rule.clone());
            entries.insert(
                keys.router(&name, "service"),
                service_target(server, protocol, router, inventory, policy),
            );

            if protocol == Protocol::Http && policy.middlewares {
                let forwarded = router
                    .middlewares
                    .iter()
                    .filter(|m| inventory.middlewares.contains(*m));
                for (j, middleware) in forwarded.enumerate() {
                    entries.insert(keys.router_item(&name, "middlewares", j), middleware.clone());
                }
            }
        }

        entries
    }
}

/// Global entry points `router` is reachable through, ordered by global name.
fn translate_entry_points<'a>(server: &'a ServerConfig, router: &RouterRecord) -> Vec<&'a str> {
    server
        .entry_points
        .iter()
        .filter(|(_, local)| router.entry_points.iter().any(|ep| ep == *local))
        .map(|(global, _)| global.as_str())
        .collect()
}

/// Service a published router points at.
///
/// Defaults to the per-server load balancer. With service forwarding, routers
/// bound to a service the server does not itself define keep their native
/// service name so the front door resolves it.
fn service_target(
    server: &ServerConfig,
    protocol: Protocol,
    router: &RouterRecord,
    inventory: &Inventory,
    policy: ForwardPolicy,
) -> String {
    let forward = protocol == Protocol::Http
        && policy.services
        && !router.service.is_empty()
        && !inventory.services.contains(&router.service);

    if forward {
        router.service.clone()
    } else {
        server.name.clone()
    }
}
