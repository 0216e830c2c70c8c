//! Request extractors that reject with [`AppError`].
//!
//! Handlers take [`Json`] from here instead of `axum::Json`, so a body that
//! does not decode answers 400 with the usual `{"message"}` shape rather
//! than axum's plain-text 415/422.

use axum::extract::FromRequest;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::AppError;

/// JSON request body or response.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Update {
        #[allow(dead_code)]
        status: String,
    }

    async fn reject(body: &str, content_type: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method("PUT").uri("/");
        if let Some(value) = content_type {
            builder = builder.header(header::CONTENT_TYPE, value);
        }
        let request = builder.body(Body::from(body.to_owned())).unwrap();
        let Err(err) = Json::<Update>::from_request(request, &()).await else {
            panic!("body should be rejected");
        };
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_bad_request() {
        for body in [r#"{"status": 3}"#, r#"{"status": null}"#, "{}"] {
            let (status, json) = reject(body, Some("application/json")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(json["message"].as_str().unwrap().contains("status"), "{body}");
        }
    }

    #[tokio::test]
    async fn test_malformed_and_untyped_bodies_are_bad_request() {
        let (status, json) = reject("{not json", Some("application/json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].is_string());

        let (status, _) = reject(r#"{"status": "shipped"}"#, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
