use axum::extract::multipart::Multipart;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::group::Group;

const MSG_REQUIRED: &str = "This field is required.";
const MSG_BAD_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
const MSG_BAD_IMAGE: &str = "Upload a valid image.";

/// Per-field validation failures. Validation always runs every field and
/// reports the failures together rather than stopping at the first one.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub data: Bytes,
}

/// Submitted fields of the post form, straight from the request body and not
/// yet validated.
#[derive(Debug, Default)]
pub struct PostForm {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image: Option<UploadedImage>,
}

/// A validated post submission, ready to persist once the handler fills in
/// the system-assigned fields (author, pub_date).
#[derive(Debug)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<UploadedImage>,
}

#[derive(Debug)]
pub struct FormReadError(pub String);

impl PostForm {
    /// Collects the recognized fields from a multipart body; unknown fields
    /// are ignored. An empty file part counts as "no image attached".
    pub async fn read(multipart: &mut Multipart) -> Result<Self, FormReadError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| FormReadError(err.to_string()))?
        {
            match field.name() {
                Some("text") => {
                    form.text = Some(
                        field
                            .text()
                            .await
                            .map_err(|err| FormReadError(err.to_string()))?,
                    );
                }
                Some("group") => {
                    form.group = Some(
                        field
                            .text()
                            .await
                            .map_err(|err| FormReadError(err.to_string()))?,
                    );
                }
                Some("image") => {
                    let file_name = field.file_name().map(str::to_owned).unwrap_or_default();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|err| FormReadError(err.to_string()))?;
                    if !data.is_empty() {
                        form.image = Some(UploadedImage { file_name, data });
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }

    /// `groups` is the set of valid group choices (the same list the form
    /// renders with).
    pub fn validate(&self, groups: &[Group]) -> Result<PostDraft, FormErrors> {
        let mut errors = FormErrors::default();

        let text = self.text.as_deref().unwrap_or("").trim();
        if text.is_empty() {
            errors.add("text", MSG_REQUIRED);
        }

        let group_id = match self.group.as_deref() {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add("group", MSG_BAD_CHOICE);
                    None
                }
            },
        };

        let image = match &self.image {
            Some(upload) => {
                if image::guess_format(&upload.data).is_err() {
                    errors.add("image", MSG_BAD_IMAGE);
                    None
                } else {
                    Some(upload.clone())
                }
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PostDraft {
            text: text.to_string(),
            group_id,
            image,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    pub text: Option<String>,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let text = self.text.as_deref().unwrap_or("").trim();
        if text.is_empty() {
            let mut errors = FormErrors::default();
            errors.add("text", MSG_REQUIRED);
            return Err(errors);
        }
        Ok(text.to_string())
    }
}
