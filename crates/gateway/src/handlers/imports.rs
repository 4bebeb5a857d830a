//! Import handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::json_body;
use crate::AppState;
use budai_common::{
    db::models::{Strain, StrainType},
    errors::{AppError, Result},
    ImportReport,
};

#[derive(Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub strains: Vec<Strain>,
    pub imported_count: usize,
    pub existing_count: usize,
    pub failed_count: usize,
}

/// Request for `/strains/bulk-import`
#[derive(Debug, Deserialize)]
pub struct BulkImportRequest {
    #[serde(rename = "type")]
    pub import_type: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct BulkImportResponse {
    pub success: bool,
    pub imported_count: usize,
    pub existing_count: usize,
    pub failed_count: usize,
    pub strains: Vec<Strain>,
    pub message: String,
}

/// What a bulk import discovers
enum BulkKind {
    Popular,
    Type(StrainType),
}

impl BulkKind {
    fn parse(raw: Option<&str>) -> Result<Self> {
        let parsed = match raw {
            Some("popular") => Ok(Self::Popular),
            Some(other) => other.parse().map(Self::Type),
            None => Err("import type is missing".to_string()),
        };

        parsed.map_err(|message| {
            AppError::Validation {
                message,
                field: Some("type".to_string()),
            }
            .context("Invalid import type. Use: popular, indica, sativa, or hybrid")
        })
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Popular => "popular",
            Self::Type(t) => t.as_str(),
        }
    }
}

/// Import by search query or by explicit URL list
pub async fn import_strains(
    State(state): State<AppState>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ImportResponse>> {
    let body = json_body(payload)?;

    let query = body
        .get("query")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty());
    let urls = body.get("urls").and_then(serde_json::Value::as_array);

    let report = match (query, urls) {
        (Some(query), _) => {
            tracing::info!(query = %query, "Search and import requested");
            state.importer.search_and_import(query).await
        }
        (None, Some(urls)) => {
            let urls: Vec<String> = urls
                .iter()
                .filter_map(|u| u.as_str().map(str::to_owned))
                .collect();
            state.importer.import_batch(&urls).await
        }
        (None, None) => {
            return Err(AppError::MissingField {
                field: "query or urls".to_string(),
            }
            .context("Either query or urls array is required"))
        }
    };

    Ok(Json(ImportResponse::from(report)))
}

/// Discover and import popular strains, or strains of one type
pub async fn bulk_import(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BulkImportRequest>, JsonRejection>,
) -> Result<Json<BulkImportResponse>> {
    let request = json_body(payload)?;
    let kind = BulkKind::parse(request.import_type.as_deref())?;
    let limit = request.limit.unwrap_or(state.config.import.default_limit);

    tracing::info!(kind = kind.label(), limit, "Bulk import requested");

    let report = match kind {
        BulkKind::Popular => state.importer.import_popular(limit).await,
        BulkKind::Type(strain_type) => state.importer.import_by_type(strain_type, limit).await,
    };

    let strains = report.strains();
    Ok(Json(BulkImportResponse {
        success: true,
        imported_count: report.imported_count(),
        existing_count: report.existing_count(),
        failed_count: report.failed_count(),
        message: format!("Successfully imported {} {} strains", strains.len(), kind.label()),
        strains,
    }))
}

impl From<ImportReport> for ImportResponse {
    fn from(report: ImportReport) -> Self {
        let strains = report.strains();
        Self {
            message: format!("Successfully imported {} strains", strains.len()),
            imported_count: report.imported_count(),
            existing_count: report.existing_count(),
            failed_count: report.failed_count(),
            strains,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use axum::http::{Method, StatusCode};
    use budai_common::db::models::{NewStrain, StrainType};
    use budai_common::{MockSource, StrainFilter};
    use serde_json::json;

    fn url(slug: &str) -> String {
        format!("https://seedfinder.eu/en/strain-info/{}/", slug)
    }

    fn source() -> MockSource {
        MockSource::new()
            .with_page(url("afghani/sensi-seeds"), NewStrain::new("Afghani", StrainType::Indica))
            .with_page(url("white-widow/green-house"), NewStrain::new("White Widow", StrainType::Hybrid))
            .with_search("afghani", [url("afghani/sensi-seeds")])
            .with_search("indica", [url("afghani/sensi-seeds"), url("white-widow/green-house")])
            .with_search("white widow", [url("white-widow/green-house")])
    }

    #[tokio::test]
    async fn test_import_same_url_twice_creates_one_record() {
        let state = testing::state(source());
        let u1 = url("afghani/sensi-seeds");

        let (status, body) = testing::send(
            testing::router(&state),
            Method::POST,
            "/api/strains/import",
            Some(json!({ "urls": [u1, u1] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully imported 2 strains");
        assert_eq!(body["imported_count"], 1);
        assert_eq!(body["existing_count"], 1);
        assert_eq!(body["strains"][0]["id"], body["strains"][1]["id"]);

        let all = state.store.query(&StrainFilter::all()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_import_by_query_skips_failures() {
        let state = testing::state(source().with_search("kush", [url("og-kush/dna"), url("afghani/sensi-seeds")]));

        let (status, body) = testing::send(
            testing::router(&state),
            Method::POST,
            "/api/strains/import",
            Some(json!({ "query": "kush" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported_count"], 1);
        assert_eq!(body["failed_count"], 1);
        assert_eq!(body["strains"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_requires_query_or_urls() {
        let state = testing::state(source());
        let (status, body) = testing::send(
            testing::router(&state),
            Method::POST,
            "/api/strains/import",
            Some(json!({ "urls": "not-a-list" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Either query or urls array is required");
    }

    #[tokio::test]
    async fn test_bulk_import_by_type() {
        let state = testing::state(source());
        let (status, body) = testing::send(
            testing::router(&state),
            Method::POST,
            "/api/strains/bulk-import",
            Some(json!({ "type": "indica", "limit": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["imported_count"], 1);
        assert_eq!(body["message"], "Successfully imported 1 indica strains");
        assert_eq!(body["strains"][0]["name"], "Afghani");
    }

    #[tokio::test]
    async fn test_bulk_import_popular() {
        let state = testing::state(source());
        let (status, body) = testing::send(
            testing::router(&state),
            Method::POST,
            "/api/strains/bulk-import",
            Some(json!({ "type": "popular" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported_count"], 1);
        assert_eq!(body["strains"][0]["name"], "White Widow");
    }

    #[tokio::test]
    async fn test_bulk_import_rejects_unknown_type() {
        let state = testing::state(source());
        for body in [json!({ "type": "ruderalis" }), json!({ "limit": 5 })] {
            let (status, body) = testing::send(
                testing::router(&state),
                Method::POST,
                "/api/strains/bulk-import",
                Some(body),
            )
            .await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Invalid import type. Use: popular, indica, sativa, or hybrid");
        }
    }
}
