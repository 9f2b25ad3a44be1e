//! Entry Routes
//!
//! The remote entries resource.
//!
//! - GET /entries - All entries, newest start time first
//! - POST /entries - Insert one entry
//! - DELETE /entries/:id - Delete by id

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::entries::TruckEntry;
use crate::websocket::WsEvent;

/// GET /entries
pub async fn list_entries(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<TruckEntry>>> {
    let entries = state.repo.list()?;
    Ok(Json(entries))
}

/// POST /entries
///
/// Insert a complete entry. Duplicate ids are rejected with 409, bodies
/// that are not an entry with 400.
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TruckEntry>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TruckEntry>)> {
    let Json(entry) = payload?;
    validate_entry(&entry)?;

    state.repo.insert(&entry)?;
    tracing::info!(entry_id = %entry.id, truck_id = %entry.truck_id, "Entry created");

    state.ws_hub.publish(WsEvent::inserted(&entry.id));

    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /entries/:id
///
/// Always 204; deleting an unknown id is a no-op.
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.repo.delete(&id)? {
        tracing::info!(entry_id = %id, "Entry deleted");
        state.ws_hub.publish(WsEvent::deleted(&id));
    } else {
        tracing::debug!(entry_id = %id, "Delete of unknown entry ignored");
    }

    Ok(StatusCode::NO_CONTENT)
}

fn validate_entry(entry: &TruckEntry) -> ApiResult<()> {
    if entry.id.trim().is_empty() {
        return Err(ApiError::Validation("Entry id cannot be empty".to_string()));
    }

    if entry.id.len() > 100 {
        return Err(ApiError::Validation(
            "Entry id exceeds maximum length of 100 characters".to_string(),
        ));
    }

    if !entry.weight.is_finite() {
        return Err(ApiError::Validation("Weight must be a finite number".to_string()));
    }

    if let Some(stop) = entry.stop_time {
        if stop < entry.start_time {
            return Err(ApiError::Validation(
                "stop_time must not precede start_time".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::FormData;
    use chrono::{Duration, Utc};

    fn sample() -> TruckEntry {
        let now = Utc::now();
        TruckEntry::from_form(&FormData::default(), now, now + Duration::seconds(1))
    }

    #[test]
    fn test_validate_accepts_complete_entry() {
        assert!(validate_entry(&sample()).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let mut e = sample();
        e.id = "  ".to_string();
        assert!(matches!(validate_entry(&e), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_stop_before_start() {
        let mut e = sample();
        e.stop_time = Some(e.start_time - Duration::seconds(1));
        assert!(matches!(validate_entry(&e), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_validate_allows_open_session() {
        let mut e = sample();
        e.stop_time = None;
        assert!(validate_entry(&e).is_ok());
    }
}
