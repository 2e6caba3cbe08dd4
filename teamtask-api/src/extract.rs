/// Request extractors that reject with the JSON error envelope
///
/// - [`ValidatedJson`]: deserializes the body, then runs `validator` rules
/// - [`ValidatedQuery`]: the same for query strings
/// - [`Id`]: a UUID path segment
///
/// Malformed JSON, unknown enum values and bad dates never reach a handler;
/// they come back as `400 bad_request`. Rule failures come back as
/// `400 validation_error` with per-field details.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has passed its `validator` rules
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;

        value.validate()?;

        Ok(Self(value))
    }
}

/// Query string that has passed its `validator` rules
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| ApiError::BadRequest(rejection.body_text()))?;

        value.validate()?;

        Ok(Self(value))
    }
}

/// Resource ID from a `/:id` path segment
#[derive(Debug, Clone, Copy)]
pub struct Id(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Id
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| {
                ApiError::BadRequest(format!("Invalid ID: {}", rejection.body_text()))
            })?;

        Ok(Self(id))
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: missing gives `None`, `null` gives `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct Body1 {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        due_date: Option<Option<chrono::NaiveDate>>,
    }

    async fn echo(ValidatedJson(body): ValidatedJson<Body1>) -> impl IntoResponse {
        body.title
    }

    async fn send(json: &str) -> StatusCode {
        let app = Router::new().route("/", post(echo));
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap();

        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_validated_json() {
        assert_eq!(send(r#"{"title":"ok"}"#).await, StatusCode::OK);
        assert_eq!(send(r#"{"title":""}"#).await, StatusCode::BAD_REQUEST);
        assert_eq!(send(r#"{"title":"#).await, StatusCode::BAD_REQUEST);
        assert_eq!(send(r#"{"title":5}"#).await, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_double_option() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.due_date, None);

        let cleared: Patch = serde_json::from_str(r#"{"due_date":null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: Patch = serde_json::from_str(r#"{"due_date":"2024-05-01"}"#).unwrap();
        assert_eq!(set.due_date, Some(chrono::NaiveDate::from_ymd_opt(2024, 5, 1)));

        assert!(serde_json::from_str::<Patch>(r#"{"due_date":"05/01/2024"}"#).is_err());
    }
}
