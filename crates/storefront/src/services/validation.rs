//! Input validation for user-submitted forms.

use thiserror::Error;

use rust_decimal::Decimal;
use url::Url;

use template_shop_core::{
    Email, EmailError, NewCategory, NewContactSubmission, Price, PriceError, ProfilePatch,
    is_valid_slug, slugify,
};

/// Highest review rating.
pub const MAX_RATING: u8 = 5;
/// Longest review comment, in characters.
pub const MAX_REVIEW_COMMENT: usize = 2000;
/// Longest contact message, in characters.
pub const MAX_CONTACT_MESSAGE: usize = 5000;
/// Longest name or subject line, in characters.
pub const MAX_SHORT_TEXT: usize = 200;
/// Longest URL accepted in a form.
pub const MAX_URL: usize = 2048;
/// Most tags on a product.
pub const MAX_TAGS: usize = 20;

/// A rejected form field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u8,
        max: u8,
    },

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid slug: {0}")]
    InvalidSlug(String),

    #[error("{0} must be an http or https URL")]
    InvalidUrl(&'static str),

    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    #[error("at most {max} tags are allowed")]
    TooManyTags { max: usize },
}

/// A validated review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewInput {
    pub rating: u8,
    pub comment: Option<String>,
}

/// Validate a review: rating 1 to 5, optional comment of bounded length.
///
/// # Errors
///
/// Returns the first field that fails.
pub fn review(rating: u8, comment: Option<&str>) -> Result<ReviewInput, ValidationError> {
    if !(1..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating",
            min: 1,
            max: MAX_RATING,
        });
    }
    let comment = optional_text("comment", comment, MAX_REVIEW_COMMENT)?;
    Ok(ReviewInput { rating, comment })
}

/// Validate a contact form submission.
///
/// # Errors
///
/// Returns the first field that fails.
pub fn contact(
    name: &str,
    email: &str,
    subject: Option<&str>,
    message: &str,
) -> Result<NewContactSubmission, ValidationError> {
    Ok(NewContactSubmission {
        name: required_text("name", name, MAX_SHORT_TEXT)?,
        email: Email::parse(email)?,
        subject: optional_text("subject", subject, MAX_SHORT_TEXT)?,
        message: required_text("message", message, MAX_CONTACT_MESSAGE)?,
    })
}

/// Validate a new category, deriving the slug from the name when omitted.
///
/// # Errors
///
/// Returns the first field that fails.
pub fn category(
    name: &str,
    slug: Option<&str>,
    description: Option<&str>,
) -> Result<NewCategory, ValidationError> {
    let name = required_text("name", name, MAX_SHORT_TEXT)?;
    let slug = slug_or_derived(slug, &name)?;
    Ok(NewCategory {
        name,
        slug,
        description: optional_text("description", description, MAX_CONTACT_MESSAGE)?,
    })
}

/// Use `slug` when given (it must be valid), otherwise derive one from `source`.
///
/// # Errors
///
/// Returns `ValidationError::InvalidSlug` for a malformed slug or a source
/// that yields an empty one.
pub fn slug_or_derived(slug: Option<&str>, source: &str) -> Result<String, ValidationError> {
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(given) => given.to_string(),
        None => slugify(source),
    };
    if is_valid_slug(&slug) {
        Ok(slug)
    } else {
        Err(ValidationError::InvalidSlug(slug))
    }
}

/// Validate a profile update. Blank fields are left unchanged.
///
/// # Errors
///
/// Returns the first field that fails.
pub fn profile(
    full_name: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<ProfilePatch, ValidationError> {
    Ok(ProfilePatch {
        full_name: optional_text("full_name", full_name, MAX_SHORT_TEXT)?,
        avatar_url: optional_url("avatar_url", avatar_url)?,
    })
}

/// Validate a product price.
///
/// # Errors
///
/// Returns `InvalidPrice` for negative, over-precise or oversized amounts.
pub fn price(amount: Decimal) -> Result<Price, ValidationError> {
    Ok(Price::new(amount)?)
}

/// Trimmed, de-duplicated, lower-case tags with blanks removed.
///
/// # Errors
///
/// Returns `TooManyTags` above [`MAX_TAGS`] and `TooLong` for a tag over
/// [`MAX_SHORT_TEXT`] characters.
pub fn tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let Some(tag) = optional_text("tag", Some(tag), MAX_SHORT_TEXT)? else {
            continue;
        };
        let tag = tag.to_lowercase();
        if !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    if cleaned.len() > MAX_TAGS {
        return Err(ValidationError::TooManyTags { max: MAX_TAGS });
    }
    Ok(cleaned)
}

/// Optional absolute `http`/`https` URL; blank becomes `None`.
///
/// # Errors
///
/// Returns `TooLong` over [`MAX_URL`] and `InvalidUrl` for anything that is
/// not an absolute web URL.
pub fn optional_url(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = optional_text(field, value, MAX_URL)? else {
        return Ok(None);
    };
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(value)),
        _ => Err(ValidationError::InvalidUrl(field)),
    }
}

/// Trimmed, non-empty text of at most `max` characters.
///
/// # Errors
///
/// Returns `Required` when blank and `TooLong` when over `max`.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    optional_text(field, Some(value), max)?.ok_or(ValidationError::Required(field))
}

/// Trimmed text of at most `max` characters; blank becomes `None`.
///
/// # Errors
///
/// Returns `TooLong` when over `max`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(Some(value.to_string()))
}
