//! Carbon footprint tracking backend.
//!
//! Hexagonal layout: [`domain`] owns entities, services and ports,
//! [`inbound`] adapts HTTP onto the driving ports, and [`outbound`]
//! implements the driven ports against PostgreSQL and JWT signing.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::{TokenGuard, Trace};
