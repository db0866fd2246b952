use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use reimburse::error::AppError;
use reimburse::model::{FeatureVector, ScoreTrace, TripInput};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub(crate) struct ReimbursementRequest {
    pub(crate) trip_duration_days: i64,
    pub(crate) miles_traveled: f64,
    pub(crate) total_receipts_amount: f64,
    #[serde(default)]
    pub(crate) explain: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReimbursementResponse {
    pub(crate) reimbursement: f64,
    pub(crate) model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) trace: Option<ScoreTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) features: Option<FeatureVector>,
}

pub(crate) fn router() -> Router {
    Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/reimbursements",
            axum::routing::post(reimbursement_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Acquire);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready", "model": state.model.as_ref() })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn reimbursement_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ReimbursementRequest>,
) -> Result<Json<ReimbursementResponse>, AppError> {
    let input = TripInput::new(
        payload.trip_duration_days,
        payload.miles_traveled,
        payload.total_receipts_amount,
    )?;

    let response = if payload.explain {
        let explanation = state.scorer.explain(&input)?;
        ReimbursementResponse {
            reimbursement: explanation.prediction.amount,
            model: state.model.to_string(),
            trace: explanation.prediction.trace,
            features: Some(explanation.features),
        }
    } else {
        ReimbursementResponse {
            reimbursement: state.scorer.amount(&input)?,
            model: state.model.to_string(),
            trace: None,
            features: None,
        }
    };

    debug!(
        days = payload.trip_duration_days,
        miles = payload.miles_traveled,
        receipts = payload.total_receipts_amount,
        amount = response.reimbursement,
        "reimbursement scored"
    );
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use reimburse::model::{Preset, Scorer};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(preset: Preset, ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            scorer: Arc::new(Scorer::new(preset.config()).expect("preset is valid")),
            model: Arc::from(format!("preset:{}", preset.name())),
        }
    }

    fn request(days: i64, miles: f64, receipts: f64, explain: bool) -> ReimbursementRequest {
        ReimbursementRequest {
            trip_duration_days: days,
            miles_traveled: miles,
            total_receipts_amount: receipts,
            explain,
        }
    }

    #[tokio::test]
    async fn reimbursement_endpoint_scores_trip() {
        let state = state(Preset::Base, true);
        let expected = state
            .scorer
            .amount(&TripInput::new(5, 900.0, 45.0).expect("valid input"))
            .expect("scores");

        let Json(body) = reimbursement_endpoint(Extension(state), Json(request(5, 900.0, 45.0, false)))
            .await
            .expect("trip scores");

        assert_eq!(body.reimbursement, expected);
        assert_eq!(body.model, "preset:base");
        assert!(body.trace.is_none());
        assert!(body.features.is_none());
    }

    #[tokio::test]
    async fn reimbursement_endpoint_can_explain() {
        let Json(body) = reimbursement_endpoint(
            Extension(state(Preset::Enhanced, true)),
            Json(request(1, 850.0, 300.49, true)),
        )
        .await
        .expect("trip scores");

        let trace = body.trace.expect("single models carry a trace");
        assert!(trace.rounding_bonus > 0.0);
        let features = body.features.expect("features returned");
        assert!(features.rounding_bug);
    }

    #[tokio::test]
    async fn invalid_trip_is_unprocessable() {
        let result = reimbursement_endpoint(
            Extension(state(Preset::Base, true)),
            Json(request(0, 100.0, 20.0, false)),
        )
        .await;

        let response = result.expect_err("zero days rejected").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let response = readiness_endpoint(Extension(state(Preset::Base, false)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = readiness_endpoint(Extension(state(Preset::Base, true)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn router_serves_health_and_scores() {
        let app = router().layer(Extension(state(Preset::Phase2, true)));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json!({
            "trip_duration_days": 3,
            "miles_traveled": 93,
            "total_receipts_amount": 1.42
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/reimbursements")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
