use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use utoipa::IntoParams;

use crate::error::ApiError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;

const MISSING: &str = "Missing data for required field.";
const NULL: &str = "Field may not be null.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_AN_INTEGER: &str = "Not a valid integer.";
const UNKNOWN: &str = "Unknown field.";

/// Validation messages keyed by field name. Sorted, so responses are stable.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Schema
///
/// Implemented by every typed request variant. `load` reports every failing field at
/// once rather than stopping at the first one.
pub trait Schema: Sized {
    fn load(value: &Value) -> Result<Self, FieldErrors>;
}

/// Fields
///
/// Cursor over one JSON object that collects per-field failures while typed values are
/// pulled out of it. `known` is the variant's complete field set; anything else in the
/// object is reported as unknown by [`Fields::finish`].
pub struct Fields<'a> {
    object: &'a Map<String, Value>,
    known: &'static [&'static str],
    errors: FieldErrors,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a Value, known: &'static [&'static str]) -> Result<Self, FieldErrors> {
        match value.as_object() {
            Some(object) => Ok(Self {
                object,
                known,
                errors: FieldErrors::new(),
            }),
            None => Err(FieldErrors::from([(
                "_schema".to_string(),
                vec!["Invalid input type.".to_string()],
            )])),
        }
    }

    /// Required string field.
    pub fn string(&mut self, name: &str) -> Option<String> {
        match self.present(name)? {
            Value::String(text) => Some(text.clone()),
            _ => self.fail(name, NOT_A_STRING),
        }
    }

    /// Required string field of at most `max` characters.
    pub fn bounded_string(&mut self, name: &str, max: usize) -> Option<String> {
        let text = self.string(name)?;
        if text.chars().count() > max {
            return self.fail(name, &format!("Longer than maximum length {max}."));
        }
        Some(text)
    }

    /// Required integer field. Integer-valued strings such as `"5"` are accepted.
    pub fn integer(&mut self, name: &str) -> Option<i32> {
        let value = self.present(name)?;
        match as_integer(value) {
            Some(number) => Some(number),
            None => self.fail(name, NOT_AN_INTEGER),
        }
    }

    /// Integer field that may be left out entirely. An explicit `null` is still an error.
    pub fn optional_integer(&mut self, name: &str) -> Option<i32> {
        if self.object.contains_key(name) {
            self.integer(name)
        } else {
            None
        }
    }

    pub fn finish(mut self) -> Result<(), FieldErrors> {
        let object = self.object;
        for key in object.keys() {
            if !self.known.contains(&key.as_str()) {
                self.fail::<()>(key, UNKNOWN);
            }
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn present(&mut self, name: &str) -> Option<&'a Value> {
        let object = self.object;
        match object.get(name) {
            None => self.fail(name, MISSING),
            Some(Value::Null) => self.fail(name, NULL),
            Some(value) => Some(value),
        }
    }

    fn fail<T>(&mut self, name: &str, message: &str) -> Option<T> {
        self.errors
            .entry(name.to_string())
            .or_default()
            .push(message.to_string());
        None
    }
}

fn as_integer(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// ValidJson
///
/// Extractor for JSON bodies validated against a [`Schema`]. A body that is not JSON
/// yields [`ApiError::MalformedBody`]; a schema mismatch yields [`ApiError::Validation`].
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: Schema + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|_| ApiError::MalformedBody)?;

        T::load(&value).map(ValidJson).map_err(ApiError::Validation)
    }
}

/// ValidPath
///
/// `Path` with the crate's JSON error body. An id that does not parse (`/users/abc`,
/// or a value outside `i32`) is a 400 `{"error": ...}` instead of axum's plain-text rejection.
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(ValidPath(value))
    }
}

/// Page
///
/// A resolved `LIMIT`/`OFFSET` window. Both values are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Resolves raw `page`/`per_page` query values.
    ///
    /// Non-numeric values fall back to the defaults. Values below 1 are rejected.
    pub fn from_query(page: Option<&str>, per_page: Option<&str>) -> Result<Self, ApiError> {
        let page = parse_or(page, DEFAULT_PAGE);
        let per_page = parse_or(per_page, DEFAULT_PER_PAGE);

        let mut errors = FieldErrors::new();
        for (name, value) in [("page", page), ("per_page", per_page)] {
            if value < 1 {
                errors.insert(
                    name.to_string(),
                    vec!["Must be greater than or equal to 1.".to_string()],
                );
            }
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(Self {
            limit: per_page,
            offset: (page - 1).saturating_mul(per_page),
        })
    }
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// PageParams
///
/// Query parameters accepted by every listing endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number (default 1).
    #[param(value_type = Option<i64>)]
    pub page: Option<String>,
    /// Records per page (default 10).
    #[param(value_type = Option<i64>)]
    pub per_page: Option<String>,
}

impl PageParams {
    pub fn page(&self) -> Result<Page, ApiError> {
        Page::from_query(self.page.as_deref(), self.per_page.as_deref())
    }
}

/// SearchParams
///
/// Query parameters for the substring-search endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    #[param(value_type = Option<i64>)]
    pub page: Option<String>,
    #[param(value_type = Option<i64>)]
    pub per_page: Option<String>,
    /// Substring to match. Absent means match everything.
    pub search: Option<String>,
}

impl SearchParams {
    pub fn page(&self) -> Result<Page, ApiError> {
        Page::from_query(self.page.as_deref(), self.per_page.as_deref())
    }

    pub fn term(&self) -> &str {
        self.search.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_every_failing_field() {
        let value = json!({ "name": 5, "count": "many", "extra": true });
        let mut fields = Fields::new(&value, &["name", "count", "missing"]).unwrap();

        assert_eq!(fields.string("name"), None);
        assert_eq!(fields.integer("count"), None);
        assert_eq!(fields.string("missing"), None);
        let errors = fields.finish().unwrap_err();

        assert_eq!(errors["name"], vec![NOT_A_STRING]);
        assert_eq!(errors["count"], vec![NOT_AN_INTEGER]);
        assert_eq!(errors["missing"], vec![MISSING]);
        assert_eq!(errors["extra"], vec![UNKNOWN]);
    }

    #[test]
    fn null_is_reported_and_integer_strings_are_accepted() {
        let value = json!({ "a": null, "b": "12", "c": 3 });
        let mut fields = Fields::new(&value, &["a", "b", "c"]).unwrap();

        assert_eq!(fields.string("a"), None);
        assert_eq!(fields.integer("b"), Some(12));
        assert_eq!(fields.optional_integer("c"), Some(3));
        assert_eq!(fields.optional_integer("d"), None);
        assert_eq!(fields.finish().unwrap_err()["a"], vec![NULL]);
    }

    #[test]
    fn bounded_string_counts_characters() {
        let value = json!({ "short": "ééé", "long": "abcd" });
        let mut fields = Fields::new(&value, &["short", "long"]).unwrap();

        assert_eq!(fields.bounded_string("short", 3), Some("ééé".to_string()));
        assert_eq!(fields.bounded_string("long", 3), None);
        assert_eq!(
            fields.finish().unwrap_err()["long"],
            vec!["Longer than maximum length 3."]
        );
    }

    #[test]
    fn non_object_body_is_rejected() {
        let errors = Fields::new(&json!([1, 2]), &[]).err().unwrap();
        assert!(errors.contains_key("_schema"));
    }

    #[test]
    fn page_two_starts_at_offset_ten() {
        let page = Page::from_query(Some("2"), Some("10")).unwrap();
        assert_eq!(page, Page { limit: 10, offset: 10 });
    }

    #[test]
    fn defaults_apply_when_missing_or_not_numeric() {
        assert_eq!(
            Page::from_query(None, Some("abc")).unwrap(),
            Page { limit: 10, offset: 0 }
        );
    }

    #[test]
    fn zero_and_negative_values_are_rejected() {
        let Err(ApiError::Validation(errors)) = Page::from_query(Some("0"), Some("-3")) else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("page"));
        assert!(errors.contains_key("per_page"));
    }
}
