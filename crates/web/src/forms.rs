//! Form bodies submitted by the pages.

use axum::extract::Multipart;
use postboard_common::{AppError, AppResult};
use postboard_core::{ImageUpload, PostInput};
use serde::Deserialize;

/// Fields of the post form, as submitted.
#[derive(Debug, Default)]
pub struct PostForm {
    pub text: String,
    pub group: String,
    pub image: Option<ImageUpload>,
}

impl PostForm {
    /// Read the multipart body of the post form.
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            match field.name() {
                Some("text") => {
                    form.text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                }
                Some("group") => {
                    form.group = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                }
                Some("image") => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(ToString::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;

                    // browsers send an empty part when no file was picked
                    if !file_name.is_empty() && !data.is_empty() {
                        form.image = Some(ImageUpload {
                            file_name,
                            content_type,
                            data: data.to_vec(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Selected group, if any.
    pub fn group_id(&self) -> AppResult<Option<i32>> {
        let group = self.group.trim();
        if group.is_empty() {
            return Ok(None);
        }
        group.parse().map(Some).map_err(|_| {
            AppError::Validation(format!(
                "group: select a valid choice, {group} is not one of the available choices"
            ))
        })
    }

    /// Service input for this form.
    pub fn input(&self) -> AppResult<PostInput> {
        Ok(PostInput {
            text: self.text.clone(),
            group_id: self.group_id()?,
        })
    }
}

/// Comment form.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

/// Signup form.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Password change form.
#[derive(Debug, Deserialize)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

/// `?next=` on the login page.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(group: &str) -> PostForm {
        PostForm {
            text: "hello".to_string(),
            group: group.to_string(),
            image: None,
        }
    }

    #[test]
    fn test_group_id() {
        assert_eq!(form("").group_id().unwrap(), None);
        assert_eq!(form(" 3 ").group_id().unwrap(), Some(3));
        assert!(matches!(form("cats").group_id(), Err(AppError::Validation(_))));
    }
}
