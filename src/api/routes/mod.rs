//! API route handlers, organized by domain.

mod extraction;
mod system;
mod videos;

pub use extraction::{
    RunStartedResponse, StartRunRequest, StopResponse, TargetedRunRequest, extraction_status,
    get_session, start_comprehensive_run, start_single_run, start_targeted_run, stop_run,
};
pub use system::{credential_status, event_stream, health_check, openapi_spec};
pub use videos::{ChannelQuery, VideoQuery, list_videos, top_channels};

// Re-export the hidden `__path_*` structs that utoipa's `#[utoipa::path]` macro
// generates next to each handler, so the `crate::api::routes::<name>` paths in
// `openapi.rs` resolve.
#[doc(hidden)]
pub use extraction::{
    __path_extraction_status, __path_get_session, __path_start_comprehensive_run,
    __path_start_single_run, __path_start_targeted_run, __path_stop_run,
};
#[doc(hidden)]
pub use system::{
    __path_credential_status, __path_event_stream, __path_health_check, __path_openapi_spec,
};
#[doc(hidden)]
pub use videos::{__path_list_videos, __path_top_channels};
