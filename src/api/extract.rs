//! Extractors that report rejections as domain failures, so malformed input
//! still produces the standard envelope.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::errors::{DomainFailure, ErrorKey, Failure, FieldErrors};

/// Input check run after deserialization
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// JSON body that must deserialize and pass [`Validate`]; otherwise `INVALID_INPUT`
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| invalid(ErrorKey::InvalidInput, "body", rejection.body_text()))?;

        value
            .validate()
            .map_err(|fields| DomainFailure::new(ErrorKey::InvalidInput).with_details(fields))?;

        Ok(Self(value))
    }
}

/// Path parameters; rejections become `INVALID_PARAM`
#[derive(Debug, Clone)]
pub struct ValidPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| invalid(ErrorKey::InvalidParam, "path", rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string; rejections become `INVALID_PARAM`
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| invalid(ErrorKey::InvalidParam, "query", rejection.body_text()))?;
        Ok(Self(value))
    }
}

fn invalid(key: ErrorKey, field: &str, message: String) -> Failure {
    let mut fields = FieldErrors::new();
    fields.insert(field.to_string(), vec![message]);
    DomainFailure::new(key).with_details(fields).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    impl Validate for Named {
        fn validate(&self) -> Result<(), FieldErrors> {
            if self.name.is_empty() {
                let mut fields = FieldErrors::new();
                fields.insert("name".to_string(), vec!["name should not be empty".to_string()]);
                return Err(fields);
            }
            Ok(())
        }
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn details(failure: Failure) -> (ErrorKey, serde_json::Value) {
        match failure {
            Failure::Domain(domain) => (
                domain.key(),
                serde_json::to_value(domain.details().unwrap()).unwrap(),
            ),
            Failure::Unexpected(_) => panic!("expected domain failure"),
        }
    }

    #[test]
    fn test_valid_body_is_accepted() {
        let ValidJson(named) =
            tokio_test::block_on(ValidJson::<Named>::from_request(json_request(r#"{"name":"kim"}"#), &()))
                .unwrap();
        assert_eq!(named.name, "kim");
    }

    #[test]
    fn test_failed_validation_reports_fields() {
        let err = tokio_test::block_on(ValidJson::<Named>::from_request(json_request(r#"{"name":""}"#), &()))
            .unwrap_err();
        let (key, details) = details(err);
        assert_eq!(key, ErrorKey::InvalidInput);
        assert_eq!(details, json!({"name": ["name should not be empty"]}));
    }

    #[test]
    fn test_malformed_body_is_invalid_input() {
        let err = tokio_test::block_on(ValidJson::<Named>::from_request(json_request("{"), &()))
            .unwrap_err();
        let (key, details) = details(err);
        assert_eq!(key, ErrorKey::InvalidInput);
        assert!(details["body"][0].is_string());
    }

    #[test]
    fn test_bad_query_is_invalid_param() {
        #[derive(Debug, Deserialize)]
        struct Page {
            #[allow(dead_code)]
            page: u32,
        }

        let (mut parts, _) = HttpRequest::builder()
            .uri("/?page=abc")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let err = tokio_test::block_on(ValidQuery::<Page>::from_request_parts(&mut parts, &()))
            .unwrap_err();
        let (key, details) = details(err);
        assert_eq!(key, ErrorKey::InvalidParam);
        assert!(details["query"][0].is_string());
    }
}
