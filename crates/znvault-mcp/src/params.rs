//! Tool argument validation.
//!
//! Raw tool-call arguments arrive as untyped JSON. The functions here turn
//! them into typed requests or reject them with a [`ValidationError`]. They
//! are pure: nothing here touches the backend, and the same input always
//! yields the same result.

use std::num::NonZeroU32;
use std::str::FromStr;

use serde_json::{Map, Value};
use znvault_client::{ListQuery, NewSecret, SecretSubType, SecretType, has_dot_segment};

use crate::error::ValidationError;

/// A non-empty secret alias or primary key with no `.` or `..` path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A 1-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(NonZeroU32);

impl Page {
    pub const DEFAULT: Self = Self(NonZeroU32::MIN);

    /// # Errors
    ///
    /// Returns [`ValidationError::NotPositive`] for zero or negative values.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(if value < 1 {
                ValidationError::NotPositive {
                    field: "page",
                    value,
                }
            } else {
                ValidationError::OutOfRange {
                    field: "page",
                    value,
                    min: 1,
                    max: i64::from(u32::MAX),
                }
            })
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Results per page, always within `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(u8);

impl PageSize {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;
    pub const DEFAULT: Self = Self(20);

    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] outside `[1, 100]`. Values are
    /// never clamped.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(ValidationError::OutOfRange {
                field: "pageSize",
                value,
                min: i64::from(Self::MIN),
                max: i64::from(Self::MAX),
            })
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// A validated list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub secret_type: Option<SecretType>,
    pub alias_prefix: Option<String>,
    pub tags: Vec<String>,
    pub page: Page,
    pub page_size: PageSize,
}

impl ListFilter {
    pub fn to_query(&self) -> ListQuery {
        ListQuery {
            secret_type: self.secret_type,
            alias_prefix: self.alias_prefix.clone(),
            tags: self.tags.clone(),
            page: self.page.get(),
            page_size: u32::from(self.page_size.get()),
        }
    }
}

/// A validated create request. `data` is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub alias: Identifier,
    pub secret_type: SecretType,
    pub sub_type: Option<SecretSubType>,
    pub data: Map<String, Value>,
    pub tags: Vec<String>,
    pub expires_at: Option<String>,
}

impl CreateRequest {
    pub fn into_new_secret(self) -> NewSecret {
        NewSecret {
            alias: self.alias.0,
            secret_type: self.secret_type,
            sub_type: self.sub_type,
            data: self.data,
            tags: self.tags,
            expires_at: self.expires_at,
        }
    }
}

/// Arguments of `get_secret`: `name`, an alias or primary key.
///
/// # Errors
///
/// Fails if `name` is missing, not a string, empty, or has a dot segment.
pub fn fetch_args(args: &Value) -> Result<Identifier, ValidationError> {
    Args::new(args)?.identifier("name")
}

/// Arguments of `decrypt_secret`: `id`, a primary key.
///
/// # Errors
///
/// Fails if `id` is missing, not a string, empty, or has a dot segment.
pub fn decrypt_args(args: &Value) -> Result<Identifier, ValidationError> {
    Args::new(args)?.identifier("id")
}

/// Arguments of `list_secrets`.
///
/// # Errors
///
/// Fails on an unknown `type`, a non-positive `page`, a `pageSize` outside
/// `[1, 100]`, or any field of the wrong JSON type.
pub fn list_args(args: &Value) -> Result<ListFilter, ValidationError> {
    let args = Args::new(args)?;
    let secret_type = args.choice::<SecretType>("type", &SecretType::ALL.map(SecretType::as_str))?;
    let alias_prefix = args.optional_str("aliasPrefix")?.filter(|p| !p.is_empty());
    let tags = args.string_set("tags")?;
    let page = args
        .optional_int("page")?
        .map_or(Ok(Page::DEFAULT), Page::new)?;
    let page_size = args
        .optional_int("pageSize")?
        .map_or(Ok(PageSize::DEFAULT), PageSize::new)?;

    Ok(ListFilter {
        secret_type,
        alias_prefix,
        tags,
        page,
        page_size,
    })
}

/// Arguments of `create_secret`.
///
/// # Errors
///
/// Fails if `alias` is missing or empty, `type` is missing or unknown,
/// `subType` is unknown, `data` is missing, not an object, or empty, or any
/// optional field has the wrong JSON type.
pub fn create_args(args: &Value) -> Result<CreateRequest, ValidationError> {
    let args = Args::new(args)?;
    let alias = args.identifier("alias")?;
    let secret_type = args
        .choice::<SecretType>("type", &SecretType::ALL.map(SecretType::as_str))?
        .ok_or(ValidationError::Missing { field: "type" })?;
    let sub_type =
        args.choice::<SecretSubType>("subType", &SecretSubType::ALL.map(SecretSubType::as_str))?;
    let data = args.object("data")?;
    if data.is_empty() {
        return Err(ValidationError::Empty { field: "data" });
    }
    let tags = args.string_set("tags")?;
    let expires_at = args.optional_str("expiresAt")?;

    Ok(CreateRequest {
        alias,
        secret_type,
        sub_type,
        data,
        tags,
        expires_at,
    })
}

/// Typed accessors over a JSON argument object. Absent and `null` fields are
/// treated alike.
struct Args<'a>(Option<&'a Map<String, Value>>);

impl<'a> Args<'a> {
    fn new(args: &'a Value) -> Result<Self, ValidationError> {
        match args {
            Value::Object(map) => Ok(Self(Some(map))),
            Value::Null => Ok(Self(None)),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.0
            .and_then(|map| map.get(field))
            .filter(|v| !v.is_null())
    }

    fn optional_str(&self, field: &'static str) -> Result<Option<String>, ValidationError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ValidationError::WrongType {
                field,
                expected: "a string",
            }),
        }
    }

    fn identifier(&self, field: &'static str) -> Result<Identifier, ValidationError> {
        let value = self
            .optional_str(field)?
            .ok_or(ValidationError::Missing { field })?;
        if value.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        if has_dot_segment(&value) {
            return Err(ValidationError::DotSegment { field });
        }
        Ok(Identifier(value))
    }

    /// Integral JSON numbers only; `2.0` is accepted, `2.5` and `"2"` are not.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn optional_int(&self, field: &'static str) -> Result<Option<i64>, ValidationError> {
        let wrong_type = ValidationError::WrongType {
            field,
            expected: "an integer",
        };
        match self.get(field) {
            None => Ok(None),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Some(i));
                }
                match n.as_f64() {
                    // Saturates for huge values, which then fail the range check.
                    Some(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
                    _ => Err(wrong_type),
                }
            }
            Some(_) => Err(wrong_type),
        }
    }

    fn choice<T: FromStr>(
        &self,
        field: &'static str,
        allowed: &[&str],
    ) -> Result<Option<T>, ValidationError> {
        let Some(value) = self.optional_str(field)? else {
            return Ok(None);
        };
        value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ValidationError::InvalidChoice {
                field,
                value,
                allowed: allowed.join(", "),
            })
    }

    /// An array of strings, de-duplicated in first-seen order.
    fn string_set(&self, field: &'static str) -> Result<Vec<String>, ValidationError> {
        let wrong_type = || ValidationError::WrongType {
            field,
            expected: "an array of strings",
        };
        let Some(value) = self.get(field) else {
            return Ok(Vec::new());
        };
        let items = value.as_array().ok_or_else(wrong_type)?;
        let mut out: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let s = item.as_str().ok_or_else(wrong_type)?;
            if !out.iter().any(|seen| seen == s) {
                out.push(s.to_owned());
            }
        }
        Ok(out)
    }

    fn object(&self, field: &'static str) -> Result<Map<String, Value>, ValidationError> {
        match self.get(field) {
            None => Err(ValidationError::Missing { field }),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(ValidationError::WrongType {
                field,
                expected: "an object",
            }),
        }
    }
}
