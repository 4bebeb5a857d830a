//! Recommendation handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;

use super::json_body;
use crate::AppState;
use budai_common::{
    db::models::Strain,
    errors::Result,
    recommend::RecommendationStrategy,
    StrainPreferences,
};

#[derive(Serialize)]
pub struct RecommendationResponse {
    pub success: bool,
    pub recommendations: Vec<Strain>,
    pub count: usize,
    /// The request body as received
    pub preferences_used: serde_json::Value,
    pub strategy: RecommendationStrategy,
}

/// Recommend up to ten strains for the submitted preferences
pub async fn recommend(
    State(state): State<AppState>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<RecommendationResponse>> {
    let raw = json_body(payload).map_err(|e| e.context("Invalid preferences"))?;

    // Wrongly typed fields degrade to the unfiltered catalog instead of failing
    let recommendation = match serde_json::from_value::<StrainPreferences>(raw.clone()) {
        Ok(preferences) => {
            tracing::debug!(preferences = ?preferences, "Resolving recommendations");
            state.resolver.resolve(&preferences).await
        }
        Err(e) => state.resolver.resolve_unreadable(&e.to_string()).await,
    };

    Ok(Json(RecommendationResponse {
        success: true,
        count: recommendation.strains.len(),
        recommendations: recommendation.strains,
        preferences_used: raw,
        strategy: recommendation.strategy,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use axum::http::{Method, StatusCode};
    use budai_common::db::models::{NewStrain, StrainType};
    use budai_common::MockSource;
    use serde_json::json;

    /// A: indica, relaxed/happy. B: sativa, energetic.
    async fn seeded() -> crate::AppState {
        let state = testing::state(MockSource::new());
        state
            .store
            .insert(NewStrain::new("A", StrainType::Indica).with_effects(["relaxed", "happy"]))
            .await
            .unwrap();
        state
            .store
            .insert(NewStrain::new("B", StrainType::Sativa).with_effects(["energetic"]))
            .await
            .unwrap();
        state
    }

    async fn names_for(prefs: serde_json::Value) -> (Vec<String>, serde_json::Value) {
        let state = seeded().await;
        let (status, body) =
            testing::send(testing::router(&state), Method::POST, "/api/recommendations", Some(prefs)).await;
        assert_eq!(status, StatusCode::OK);

        let names = body["recommendations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect();
        (names, body)
    }

    #[tokio::test]
    async fn test_type_filter() {
        let (names, body) = names_for(json!({ "type": "indica" })).await;
        assert_eq!(names, vec!["A"]);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["strategy"], "matched");
        assert_eq!(body["preferences_used"], json!({ "type": "indica" }));
    }

    #[tokio::test]
    async fn test_effect_overlap() {
        let (names, _) = names_for(json!({ "effects": ["happy"] })).await;
        assert_eq!(names, vec!["A"]);
    }

    #[tokio::test]
    async fn test_no_match_falls_back() {
        let (names, body) = names_for(json!({ "type": "hybrid" })).await;
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(body["strategy"], "fallback_no_match");
    }

    #[tokio::test]
    async fn test_reserved_fields_are_echoed() {
        let prefs = json!({ "mood": ["chill"], "thc_preference": "low" });
        let (names, body) = names_for(prefs.clone()).await;
        assert_eq!(names.len(), 2);
        assert_eq!(body["preferences_used"], prefs);
    }

    #[tokio::test]
    async fn test_blank_type_is_ignored() {
        let (names, body) = names_for(json!({ "type": "", "effects": ["happy"] })).await;
        assert_eq!(names, vec!["A"]);
        assert_eq!(body["strategy"], "matched");
    }

    #[tokio::test]
    async fn test_wrongly_typed_preferences_fall_back() {
        for prefs in [json!({ "effects": "happy" }), json!({ "thc_preference": 3 })] {
            let (names, body) = names_for(prefs.clone()).await;
            assert_eq!(names, vec!["A", "B"]);
            assert_eq!(body["success"], true);
            assert_eq!(body["strategy"], "fallback_query_error");
            assert_eq!(body["preferences_used"], prefs);
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_rejected() {
        let state = seeded().await;
        let request = axum::http::Request::post("/api/recommendations")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let response = tower::ServiceExt::oneshot(testing::router(&state), request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
