//! Strain catalog handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{json_body, rejected};
use crate::AppState;
use budai_common::{
    db::models::{NewStrain, Strain, StrainPatch},
    errors::{AppError, Result},
    StrainFilter,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Substring over name, breeder and genetics
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::StrainNotFound { id: raw.to_string() })
}

/// List the catalog, or search it with `?search=`
pub async fn list_strains(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Strain>>> {
    let filter = match query.search.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => StrainFilter::search(text),
        _ => StrainFilter::all(),
    };

    let strains = state
        .store
        .query(&filter)
        .await
        .map_err(|e| e.context("Failed to fetch strains"))?;

    Ok(Json(strains))
}

/// Get a strain by ID
pub async fn get_strain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Strain>> {
    let id = parse_id(&id)?;

    let strain = state
        .store
        .find_by_id(id)
        .await
        .map_err(|e| e.context("Failed to fetch strain"))?
        .ok_or_else(|| AppError::StrainNotFound { id: id.to_string() })?;

    Ok(Json(strain))
}

/// Partially update a strain
pub async fn update_strain(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<Strain>> {
    let updated = apply_patch(&state, &id, payload)
        .await
        .map_err(rejected("Failed to update strain"))?;

    tracing::info!(id = %updated.id, "Strain updated");
    Ok(Json(updated))
}

async fn apply_patch(
    state: &AppState,
    id: &str,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Strain> {
    let id = parse_id(id)?;
    let patch = StrainPatch::from_json(json_body(payload)?)?;

    if patch.is_empty() {
        return Err(AppError::Validation {
            message: "No fields to update".to_string(),
            field: None,
        });
    }
    patch.validate()?;

    state
        .store
        .update(id, patch)
        .await?
        .ok_or_else(|| AppError::StrainNotFound { id: id.to_string() })
}

/// Delete a strain
pub async fn delete_strain(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    remove(&state, &id)
        .await
        .map_err(rejected("Failed to delete strain"))?;

    Ok(Json(MessageResponse {
        message: "Strain deleted successfully".to_string(),
    }))
}

async fn remove(state: &AppState, id: &str) -> Result<()> {
    let id = parse_id(id)?;

    if !state.store.delete(id).await? {
        return Err(AppError::StrainNotFound { id: id.to_string() });
    }

    tracing::info!(id = %id, "Strain deleted");
    Ok(())
}

/// Create a strain, or import it when the body carries a `seedfinder_url`
pub async fn create_strain(
    State(state): State<AppState>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Strain>)> {
    let body = json_body(payload).map_err(rejected("Failed to create strain"))?;

    let import_url = body
        .get("seedfinder_url")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_owned);

    let strain = match import_url {
        Some(url) => {
            tracing::info!(url = %url, "Importing strain from source");
            state
                .importer
                .import_one(&url)
                .await
                .map(|outcome| outcome.into_strain())
                .map_err(rejected("Failed to import strain from Seedfinder"))?
        }
        None => create_from_payload(&state, body)
            .await
            .map_err(rejected("Failed to create strain"))?,
    };

    Ok((StatusCode::CREATED, Json(strain)))
}

async fn create_from_payload(state: &AppState, body: serde_json::Value) -> Result<Strain> {
    let mut strain: NewStrain = serde_json::from_value(body).map_err(|e| AppError::InvalidFormat {
        message: e.to_string(),
    })?;
    // Empty string means "no source link"
    strain.seedfinder_url = None;
    strain.validate()?;

    let created = state.store.insert(strain).await?;
    tracing::info!(id = %created.id, name = %created.name, "Strain created");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use axum::http::{Method, StatusCode};
    use budai_common::db::models::{NewStrain, StrainType};
    use budai_common::MockSource;
    use serde_json::json;

    const URL: &str = "https://seedfinder.eu/en/strain-info/afghani/sensi-seeds/";

    #[tokio::test]
    async fn test_create_get_and_list() {
        let state = testing::state(MockSource::new());
        let app = testing::router(&state);

        let (status, created) = testing::send(
            app.clone(),
            Method::POST,
            "/api/strains",
            Some(json!({ "name": "Blue Dream", "type": "hybrid", "effects": ["happy"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["type"], "hybrid");
        assert_eq!(created["breeder"], "");

        let id = created["id"].as_str().unwrap();
        let (status, fetched) =
            testing::send(app.clone(), Method::GET, &format!("/api/strains/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        testing::send(
            app.clone(),
            Method::POST,
            "/api/strains",
            Some(json!({ "name": "Afghani", "type": "indica", "breeder": "Sensi Seeds" })),
        )
        .await;

        let (_, all) = testing::send(app.clone(), Method::GET, "/api/strains", None).await;
        let names: Vec<_> = all.as_array().unwrap().iter().map(|s| s["name"].clone()).collect();
        assert_eq!(names, vec![json!("Afghani"), json!("Blue Dream")]);

        let (_, found) = testing::send(app, Method::GET, "/api/strains?search=sensi", None).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_or_malformed_id() {
        let state = testing::state(MockSource::new());
        let app = testing::router(&state);

        let uri = format!("/api/strains/{}", uuid::Uuid::new_v4());
        let (status, body) = testing::send(app.clone(), Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Strain not found");

        let (status, _) = testing::send(app, Method::GET, "/api/strains/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_payload() {
        let state = testing::state(MockSource::new());
        let (status, body) = testing::send(
            testing::router(&state),
            Method::POST,
            "/api/strains",
            Some(json!({ "name": "X", "type": "ruderalis" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Failed to create strain");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_create_with_url_imports() {
        let source = MockSource::new().with_page(URL, NewStrain::new("Afghani", StrainType::Indica));
        let state = testing::state(source);
        let app = testing::router(&state);

        let (status, first) =
            testing::send(app.clone(), Method::POST, "/api/strains", Some(json!({ "seedfinder_url": URL }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["seedfinder_url"], URL);

        let (_, second) =
            testing::send(app.clone(), Method::POST, "/api/strains", Some(json!({ "seedfinder_url": URL }))).await;
        assert_eq!(second["id"], first["id"]);

        let (status, body) = testing::send(
            app,
            Method::POST,
            "/api/strains",
            Some(json!({ "seedfinder_url": "https://seedfinder.eu/en/strain-info/gone/nobody/" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Failed to import strain from Seedfinder");
    }

    #[tokio::test]
    async fn test_update_strain() {
        let state = testing::state(MockSource::new());
        let app = testing::router(&state);
        let strain = state
            .store
            .insert(NewStrain::new("Jack Herer", StrainType::Sativa))
            .await
            .unwrap();
        let uri = format!("/api/strains/{}", strain.id);

        let (status, body) =
            testing::send(app.clone(), Method::PUT, &uri, Some(json!({ "thc_content": "18-23%" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["thc_content"], "18-23%");
        assert_eq!(body["name"], "Jack Herer");

        let (status, body) = testing::send(app.clone(), Method::PUT, &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Failed to update strain");

        // A fetched record can be sent back as-is with edits
        let (_, mut fetched) = testing::send(app.clone(), Method::GET, &uri, None).await;
        fetched["breeder"] = json!("Sensi Seeds");
        let (status, body) = testing::send(app.clone(), Method::PUT, &uri, Some(fetched)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["breeder"], "Sensi Seeds");
        assert_eq!(body["thc_content"], "18-23%");

        let missing = format!("/api/strains/{}", uuid::Uuid::new_v4());
        let (status, body) =
            testing::send(app, Method::PUT, &missing, Some(json!({ "name": "X" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Failed to update strain");
    }

    #[tokio::test]
    async fn test_delete_strain() {
        let state = testing::state(MockSource::new());
        let app = testing::router(&state);
        let strain = state
            .store
            .insert(NewStrain::new("Cheese", StrainType::Hybrid))
            .await
            .unwrap();
        let uri = format!("/api/strains/{}", strain.id);

        let (status, body) = testing::send(app.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Strain deleted successfully" }));

        let (status, body) = testing::send(app.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Failed to delete strain");

        let (status, _) = testing::send(app, Method::DELETE, "/api/strains/42", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
