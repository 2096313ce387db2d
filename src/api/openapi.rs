//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the video-harvest REST
//! API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the video-harvest REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "video-harvest REST API",
        version = "0.2.0",
        description = "REST API for triggering video metadata extraction runs, monitoring sessions and credentials, and querying harvested items",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6780/api/v1", description = "Local development server")
    ),
    paths(
        // Extraction
        crate::api::routes::start_single_run,
        crate::api::routes::start_comprehensive_run,
        crate::api::routes::start_targeted_run,
        crate::api::routes::stop_run,
        crate::api::routes::extraction_status,
        crate::api::routes::get_session,

        // Harvested data
        crate::api::routes::list_videos,
        crate::api::routes::top_channels,

        // System
        crate::api::routes::credential_status,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::api::routes::StartRunRequest,
        crate::api::routes::TargetedRunRequest,
        crate::api::routes::RunStartedResponse,
        crate::api::routes::StopResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
        crate::types::HarvestStatus,
        crate::types::SessionId,
        crate::types::SessionSnapshot,
        crate::types::SessionStatus,
        crate::types::RunMode,
        crate::types::RunnerState,
        crate::types::RunParams,
        crate::types::CacheStats,
        crate::credentials::CredentialPoolStatus,
        crate::credentials::CredentialSummary,
        crate::db::CachedVideo,
        crate::db::ChannelAggregate,
    )),
    tags(
        (name = "extraction", description = "Extraction run management"),
        (name = "videos", description = "Harvested video cache"),
        (name = "system", description = "Health, credentials and events"),
    )
)]
pub struct ApiDoc;
