//! Validation of admin-submitted settings.
//!
//! Each integration protocol describes its settings as [`SettingField`]s.
//! [`Validator::validate`] checks a submitted form against those fields and
//! returns the first problem it finds. Blank fields are not checked here;
//! whether a field is required is the controller's business.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::problem::{
    ProblemDetail, INVALID_CONFIGURATION_OPTION, INVALID_EMAIL, INVALID_NUMBER, INVALID_URL, UNKNOWN_LANGUAGE,
};
use crate::lanes::languages::string_to_alpha_3;

/// Form key holding the value of a sitewide setting.
pub const SITEWIDE_VALUE_KEY: &str = "value";

const EMAIL_FORMAT: &str = r".+@.+\..+";

pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";
pub const PNG_MEDIA_TYPE: &str = "image/png";
pub const GIF_MEDIA_TYPE: &str = "image/gif";

fn email_format() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_FORMAT).ok()).as_ref()
}

/// What kind of input a setting takes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Email,
    Url {
        /// Values accepted even though they are not URLs, like `*`.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        allowed: Vec<String>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
    },
    LanguageCode,
    Image,
}

/// One configurable setting of an integration protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingField {
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
}

impl SettingField {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Submitted form fields, in order. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Every value for `key`.
    pub fn getlist(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// An uploaded file. Only its declared type matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub content_type: Option<String>,
}

/// Everything the admin submitted.
#[derive(Debug, Clone, Default)]
pub struct SubmittedContent {
    pub form: FormData,
    /// Uploads keyed by setting key.
    pub files: BTreeMap<String, UploadedFile>,
}

impl SubmittedContent {
    pub fn from_form(form: FormData) -> Self {
        Self {
            form,
            files: BTreeMap::new(),
        }
    }
}

/// The user's input for a field.
///
/// A setting that isn't in the form under its own key may be a sitewide
/// setting, which is submitted as `value`. Blank values are dropped.
pub fn field_values(field: &SettingField, form: &FormData) -> Vec<String> {
    let values = form.getlist(&field.key);
    let values = if values.is_empty() {
        form.get(SITEWIDE_VALUE_KEY).into_iter().collect()
    } else {
        values
    };
    values
        .into_iter()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Checks submitted settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Run every check in turn and return the first problem.
    pub fn validate(&self, settings: &[SettingField], content: &SubmittedContent) -> Result<(), ProblemDetail> {
        self.validate_email(settings, &content.form)?;
        self.validate_url(settings, &content.form)?;
        self.validate_number(settings, &content.form)?;
        self.validate_language_code(settings, &content.form)?;
        self.validate_image(settings, &content.files)?;
        Ok(())
    }

    fn inputs<'a>(
        settings: &'a [SettingField],
        form: &FormData,
        matches: impl Fn(&FieldKind) -> bool,
    ) -> Vec<(&'a SettingField, String)> {
        settings
            .iter()
            .filter(|field| matches(&field.kind))
            .flat_map(|field| field_values(field, form).into_iter().map(move |v| (field, v)))
            .collect()
    }

    pub fn validate_email(&self, settings: &[SettingField], form: &FormData) -> Result<(), ProblemDetail> {
        for (_, email) in Self::inputs(settings, form, |k| matches!(k, FieldKind::Email)) {
            self.validate_email_address(&email)?;
        }
        Ok(())
    }

    /// Check a single address, such as an admin's login.
    pub fn validate_email_address(&self, email: &str) -> Result<(), ProblemDetail> {
        if is_email(email) {
            Ok(())
        } else {
            Err(INVALID_EMAIL.detailed(format!("\"{}\" is not a valid email address.", email)))
        }
    }

    pub fn validate_url(&self, settings: &[SettingField], form: &FormData) -> Result<(), ProblemDetail> {
        for (field, url) in Self::inputs(settings, form, |k| matches!(k, FieldKind::Url { .. })) {
            let allowed: &[String] = match &field.kind {
                FieldKind::Url { allowed } => allowed,
                _ => &[],
            };
            if !is_url(&url, allowed) {
                return Err(INVALID_URL.detailed(format!("\"{}\" is not a valid URL.", url)));
            }
        }
        Ok(())
    }

    pub fn validate_number(&self, settings: &[SettingField], form: &FormData) -> Result<(), ProblemDetail> {
        for (field, number) in Self::inputs(settings, form, |k| matches!(k, FieldKind::Number { .. })) {
            if let FieldKind::Number { min, max } = &field.kind {
                number_error(&field.label, &number, *min, *max)?;
            }
        }
        Ok(())
    }

    pub fn validate_language_code(&self, settings: &[SettingField], form: &FormData) -> Result<(), ProblemDetail> {
        for (_, language) in Self::inputs(settings, form, |k| matches!(k, FieldKind::LanguageCode)) {
            if string_to_alpha_3(&language).is_none() {
                return Err(UNKNOWN_LANGUAGE.detailed(format!("\"{}\" is not a valid language code.", language)));
            }
        }
        Ok(())
    }

    pub fn validate_image(
        &self,
        settings: &[SettingField],
        files: &BTreeMap<String, UploadedFile>,
    ) -> Result<(), ProblemDetail> {
        let images = settings
            .iter()
            .filter(|field| field.kind == FieldKind::Image)
            .filter_map(|field| files.get(&field.key).map(|file| (field, file)));

        for (field, file) in images {
            if let Some(format) = image_format_error(file) {
                return Err(INVALID_CONFIGURATION_OPTION.detailed(format!(
                    "Upload for {} must be in GIF, PNG, or JPG format. (Upload was {}.)",
                    field.label, format
                )));
            }
        }
        Ok(())
    }
}

fn is_email(email: &str) -> bool {
    email_format().map_or(false, |re| re.is_match(email))
}

fn is_url(url: &str, allowed: &[String]) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || allowed.iter().any(|a| a == url)
}

fn number_error(label: &str, number: &str, min: Option<f64>, max: Option<f64>) -> Result<(), ProblemDetail> {
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| INVALID_NUMBER.detailed(format!("\"{}\" is not a number.", number)))?;

    let min = min.unwrap_or(0.0);
    if value < min {
        return Err(INVALID_NUMBER.detailed(format!("{} must be greater than {}.", label, min)));
    }
    if let Some(max) = max.filter(|m| *m != 0.0) {
        if value > max {
            return Err(INVALID_NUMBER.detailed(format!("{} cannot be greater than {}.", label, max)));
        }
    }
    Ok(())
}

/// The offending type, when the upload isn't an accepted image.
fn image_format_error(file: &UploadedFile) -> Option<String> {
    match file.content_type.as_deref() {
        Some(JPEG_MEDIA_TYPE | PNG_MEDIA_TYPE | GIF_MEDIA_TYPE) => None,
        Some(other) => Some(other.to_string()),
        None => Some("of unknown type".to_string()),
    }
}
