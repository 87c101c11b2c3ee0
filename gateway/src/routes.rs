//! Route table.

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use common::errors::{AppError, AppResult};
use crate::handlers;
use crate::state::AppState;

/// Builds the service routes.
///
/// Only the `/connect` routes carry the CORS layer, restricted to
/// `allowed_origin`.
pub fn router(allowed_origin: &str) -> AppResult<Router<AppState>> {
    let connect = Router::new()
        .route("/connect/{user}/{password}/{database}", get(handlers::list_tables))
        .route(
            "/connect/columns/{user}/{password}/{database}/{table}",
            get(handlers::list_columns),
        )
        .route(
            "/connect/data/{user}/{password}/{database}/{table}/{column}",
            get(handlers::column_values),
        )
        .route(
            "/connect/value/{user}/{password}/{database}/{table}/{column}/{value}",
            get(handlers::filtered_rows),
        )
        .layer(cors_layer(allowed_origin)?);

    Ok(Router::new()
        .merge(connect)
        .route("/api/health", get(handlers::health_check)))
}

fn cors_layer(allowed_origin: &str) -> AppResult<CorsLayer> {
    let origin = HeaderValue::from_str(allowed_origin)
        .map_err(|_| AppError::Config(format!("invalid ALLOWED_ORIGIN '{allowed_origin}'")))?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool_manager::tests::{seed_sqlite, sqlite_config};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const ORIGIN: &str = "http://localhost:8100";

    async fn fixture() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        seed_sqlite(
            dir.path(),
            "salesdb",
            &[
                "CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT, note TEXT, qty INTEGER)",
                "INSERT INTO orders VALUES (1, 'open', 'rush', 1)",
                "INSERT INTO orders VALUES (2, 'open', NULL, 2)",
                "INSERT INTO orders VALUES (3, 'closed', 'gift', 2)",
                "INSERT INTO orders VALUES (4, 'closed', '', 3)",
                "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT)",
                "CREATE VIEW open_orders AS SELECT id, status, note FROM orders WHERE status = 'open'",
            ],
        )
        .await;
        seed_sqlite(
            dir.path(),
            "hrdb",
            &["CREATE TABLE employees (id INTEGER, name TEXT)"],
        )
        .await;

        let state = AppState::new(sqlite_config(dir.path(), 4));
        let app = router(ORIGIN).unwrap().with_state(state);
        (dir, app)
    }

    async fn get(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_tables() {
        let (_dir, app) = fixture().await;
        let response = get(&app, "/connect/alice/pw123/salesdb").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "message": "Dados recebidos com sucesso!",
                "usuario": "alice",
                "banco": "salesdb",
                "tabelas": ["customers", "orders"],
            })
        );

        // Idempotent on an unchanged schema.
        let again = body_json(get(&app, "/connect/alice/pw123/salesdb").await).await;
        assert_eq!(again["tabelas"], json!(["customers", "orders"]));
    }

    #[tokio::test]
    async fn test_unknown_database_is_generic_failure() {
        let (_dir, app) = fixture().await;
        let response = get(&app, "/connect/alice/pw123/nosuchdb").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Erro ao conectar ao banco de dados");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn test_list_columns() {
        let (_dir, app) = fixture().await;
        let response = get(&app, "/connect/columns/alice/pw123/salesdb/orders").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "message": "Colunas da tabela orders recebidas com sucesso!",
                "tabela": "orders",
                "colunas": ["id", "status", "note", "qty"],
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_table_is_generic_failure() {
        let (_dir, app) = fixture().await;
        let response = get(&app, "/connect/columns/alice/pw123/salesdb/ghost").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Erro ao buscar as colunas");
        assert_eq!(body["error"], "table 'ghost' not found");
    }

    #[tokio::test]
    async fn test_views_are_queryable_by_name() {
        let (_dir, app) = fixture().await;
        let response = get(&app, "/connect/columns/alice/pw123/salesdb/open_orders").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["colunas"],
            json!(["id", "status", "note"])
        );

        let body = body_json(
            get(&app, "/connect/value/alice/pw123/salesdb/open_orders/status/open").await,
        )
        .await;
        assert_eq!(
            body["dados"],
            json!([["id", "status"], [1, "open"], [2, "open"]])
        );
    }

    #[tokio::test]
    async fn test_identity_switch_returns_new_schema() {
        let (_dir, app) = fixture().await;
        get(&app, "/connect/alice/pw123/salesdb").await;

        let body = body_json(get(&app, "/connect/alice/pw123/hrdb").await).await;
        assert_eq!(body["tabelas"], json!(["employees"]));

        let response = get(&app, "/connect/columns/alice/pw123/hrdb/orders").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_distinct_values() {
        let (_dir, app) = fixture().await;
        let response = get(&app, "/connect/data/alice/pw123/salesdb/orders/qty").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["tabela"], "orders");
        assert_eq!(body["coluna"], "qty");
        let mut values: Vec<i64> = body["dados"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        values.sort();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_distinct_values_unknown_column() {
        let (_dir, app) = fixture().await;
        let response = get(&app, "/connect/data/alice/pw123/salesdb/orders/nope").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({
                "message": "Coluna 'nope' não encontrada na tabela orders.",
                "colunas": ["id", "status", "note", "qty"],
            })
        );
    }

    #[tokio::test]
    async fn test_filtered_rows_drop_incomplete_columns() {
        let (_dir, app) = fixture().await;
        let response = get(&app, "/connect/value/alice/pw123/salesdb/orders/status/open").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        // `note` is NULL in one open order, so it vanishes from every row.
        assert_eq!(body["colunas_validas"], json!(["id", "status", "qty"]));
        assert_eq!(
            body["dados"],
            json!([["id", "status", "qty"], [1, "open", 1], [2, "open", 2]])
        );
    }

    #[tokio::test]
    async fn test_filtered_rows_empty_string_counts_as_missing() {
        let (_dir, app) = fixture().await;
        let body = body_json(
            get(&app, "/connect/value/alice/pw123/salesdb/orders/status/closed").await,
        )
        .await;
        assert_eq!(body["colunas_validas"], json!(["id", "status", "qty"]));
    }

    #[tokio::test]
    async fn test_filtered_rows_value_is_coerced_by_database() {
        let (_dir, app) = fixture().await;
        let body =
            body_json(get(&app, "/connect/value/alice/pw123/salesdb/orders/qty/2").await).await;
        assert_eq!(body["dados"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_filtered_rows_no_match_keeps_header() {
        let (_dir, app) = fixture().await;
        let body = body_json(
            get(&app, "/connect/value/alice/pw123/salesdb/orders/status/missing").await,
        )
        .await;
        assert_eq!(body["dados"], json!([["id", "status", "note", "qty"]]));
    }

    #[tokio::test]
    async fn test_filtered_rows_value_is_not_sql() {
        let (_dir, app) = fixture().await;
        let response = get(
            &app,
            "/connect/value/alice/pw123/salesdb/orders/status/x'%20OR%20'1'='1",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["dados"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_filtered_rows_unknown_column() {
        let (_dir, app) = fixture().await;
        let response = get(&app, "/connect/value/alice/pw123/salesdb/orders/nope/1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["colunas"],
            json!(["id", "status", "note", "qty"])
        );
    }

    #[tokio::test]
    async fn test_oversized_identifier_is_rejected() {
        let (_dir, app) = fixture().await;
        let uri = format!("/connect/columns/alice/pw123/salesdb/{}", "t".repeat(64));
        let response = get(&app, &uri).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Erro ao buscar as colunas");
    }

    #[tokio::test]
    async fn test_health_counts_cached_connections() {
        let (_dir, app) = fixture().await;
        get(&app, "/connect/alice/pw123/salesdb").await;
        let body = body_json(get(&app, "/api/health").await).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 1);
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed_origin() {
        let (_dir, app) = fixture().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/connect/alice/pw123/salesdb")
                    .header(header::ORIGIN, ORIGIN)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            ORIGIN
        );
    }

    #[tokio::test]
    async fn test_cors_other_origin_gets_no_allow_header() {
        let (_dir, app) = fixture().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/connect/alice/pw123/salesdb")
                    .header(header::ORIGIN, "http://evil.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[test]
    fn test_invalid_origin_is_config_error() {
        assert!(matches!(router("bad\norigin"), Err(AppError::Config(_))));
    }
}
