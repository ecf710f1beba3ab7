// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS handler shim.
//!
//! [`DnsFilter`] sits in the host resolver's plugin chain. Per request it
//! extracts the client address and query name, asks the engine for a
//! decision, and either synthesizes an NXDOMAIN reply (deny) or delegates
//! to the next handler unchanged (allow). The shim performs no socket
//! I/O; the host framework owns dispatch and wire encoding.

use crate::engine::FilterEngine;
use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// The downstream seam of the plugin chain.
///
/// Returning `None` means the chain produced no reply (the host framework
/// decides what that means); the filter itself never converts an allowed
/// query into a reply of its own.
#[async_trait]
pub trait NextHandler: Send + Sync {
    /// Handle a request this filter allowed through.
    async fn handle(&self, source: IpAddr, request: &Message) -> Option<Message>;
}

/// The filtering plugin: one engine reference plus the next handler.
pub struct DnsFilter {
    engine: Arc<FilterEngine>,
    next: Arc<dyn NextHandler>,
}

impl DnsFilter {
    /// Wire the filter between the engine and the rest of the chain.
    pub fn new(engine: Arc<FilterEngine>, next: Arc<dyn NextHandler>) -> Self {
        Self { engine, next }
    }

    /// Filter one request.
    ///
    /// Denied queries are answered directly with an NXDOMAIN reply that
    /// echoes the request id, opcode and question. A request without a
    /// question section cannot be evaluated and degrades to deny.
    pub async fn handle(&self, source: IpAddr, request: &Message) -> Option<Message> {
        let Some(query) = request.queries().first() else {
            debug!(client = %source, "request without question section, denying");
            return Some(Self::nxdomain(request));
        };
        let name = query.name().to_utf8();

        if self
            .engine
            .decide(&source.to_string(), &name)
            .await
            .is_allowed()
        {
            self.next.handle(source, request).await
        } else {
            debug!(client = %source, domain = %name, "query denied");
            Some(Self::nxdomain(request))
        }
    }

    /// Build the synthesized non-existence reply for a denied request.
    fn nxdomain(request: &Message) -> Message {
        let mut response =
            Message::error_msg(request.id(), request.op_code(), ResponseCode::NXDomain);
        for query in request.queries() {
            response.add_query(query.clone());
        }
        response
    }
}
