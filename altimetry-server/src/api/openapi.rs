//! OpenAPI specification generated via `utoipa` (spec §6, external
//! interfaces). Documents the intake/poll surface in depth; the
//! provider-roster and collection routes are covered by `GET /provider`
//! and `GET /collection/<cid>` themselves, which is enough for most
//! integrators without annotating every handler.

use utoipa::OpenApi;

use crate::api::routes::{health, item, root, tiid};

/// OpenAPI 3.1 document for the altimetry HTTP API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Altimetry API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Intake, polling, and provider-roster introspection over the altmetrics update pipeline.",
        contact(
            name = "Total-Impact Maintainers",
            email = "maintainers@total-impact.org"
        )
    ),
    paths(
        root::version_banner,
        health::health,
        health::ready,
        item::create_item,
        item::get_item,
        tiid::lookup_tiid,
    ),
    components(schemas(root::VersionBanner, health::ProbeBody)),
    tags(
        (name = "root", description = "Version banner"),
        (name = "health", description = "Health, readiness, and liveness probes"),
        (name = "item", description = "Item intake and polling"),
    )
)]
pub struct ApiDoc;
