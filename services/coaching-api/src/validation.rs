//! Request validation: JSON bodies checked with `validator` and path ids
//! parsed as UUIDs, both reported as 400 with field-level details.

use axum::{
    async_trait,
    body::HttpBody,
    extract::{rejection::JsonRejection, FromRequest},
    http::Request,
    BoxError, Json,
};
use serde::de::DeserializeOwned;
use shared::dto::FieldIssue;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::error::ApiError;

/// JSON body that passed [`Validate::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejected_body)?;
        value.validate().map_err(|e| ApiError::Validation(issues(&e)))?;
        Ok(ValidatedJson(value))
    }
}

fn rejected_body(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(vec![FieldIssue {
        path: vec!["body".to_string()],
        message: rejection.body_text(),
    }])
}

/// Flattens validator output into `{path, message}` pairs, sorted by field.
pub fn issues(errors: &ValidationErrors) -> Vec<FieldIssue> {
    let mut out: Vec<FieldIssue> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldIssue {
                path: vec![field.to_string()],
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

/// Parses a path segment as UUID, naming the parameter on failure.
pub fn parse_id(raw: &str, param: &str, label: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::Validation(vec![FieldIssue {
            path: vec![param.to_string()],
            message: format!("Invalid {label} ID"),
        }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::dto::GenerateRequest;

    #[test]
    fn issues_are_sorted_with_messages() {
        let req = GenerateRequest { ae_email: "nope".into(), gong_call_id: String::new() };
        let errors = req.validate().unwrap_err();
        let list = issues(&errors);
        assert_eq!(
            list,
            vec![
                FieldIssue { path: vec!["ae_email".into()], message: "Invalid email address".into() },
                FieldIssue {
                    path: vec!["gong_call_id".into()],
                    message: "Gong call ID is required".into()
                },
            ]
        );
    }

    #[test]
    fn bad_path_id_names_param() {
        match parse_id("not-a-uuid", "strategyId", "strategy") {
            Err(ApiError::Validation(details)) => {
                assert_eq!(details[0].path, vec!["strategyId".to_string()]);
                assert_eq!(details[0].message, "Invalid strategy ID");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
