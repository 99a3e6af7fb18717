use crate::error::model_error::ModelError;
use crate::{Credential, ErrorLocation};

use std::panic::Location;

/// Builder for creating validated Credential instances.
#[derive(Debug, Default)]
pub struct CredentialBuilder {
    user_id: Option<String>,
    credential_id: Option<String>,
    name: Option<String>,
    username: Option<String>,
    password: Option<String>,
    url: Option<String>,
}

impl CredentialBuilder {
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_credential_id(mut self, credential_id: impl Into<String>) -> Self {
        self.credential_id = Some(credential_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Build the Credential with validation.
    #[track_caller]
    pub fn build(self) -> Result<Credential, ModelError> {
        let user_id = self.user_id.ok_or_else(|| ModelError::Validation {
            message: String::from("User ID is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if user_id.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("User ID cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let url = self.url.ok_or_else(|| ModelError::Validation {
            message: String::from("URL is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if url.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("URL cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(ref id) = self.credential_id
            && id.is_empty()
        {
            return Err(ModelError::Validation {
                message: String::from("Credential ID cannot be empty when set"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Credential {
            user_id,
            credential_id: self.credential_id,
            name: self.name,
            username: self.username,
            password: self.password,
            url,
        })
    }
}
