use super::Share;
use crate::{access::ShareRole, JsonRpcRequest};
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

const EMAIL_MAX_LEN: usize = 254;

/// Grants `email` the given role on a list. The server caps `expires_in_days`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub list_id: Uuid,
    pub email: String,
    pub role: ShareRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_days: Option<u32>,
}

impl Params {
    pub fn new(
        list_id: Uuid,
        email: &str,
        role: ShareRole,
        expires_in_days: Option<u32>,
    ) -> Result<Self, InvalidParams> {
        let email = normalize_email(email).ok_or(InvalidParams::InvalidEmail)?;
        if expires_in_days == Some(0) {
            return Err(InvalidParams::InvalidExpiry);
        }

        Ok(Self {
            list_id,
            email,
            role,
            expires_in_days,
        })
    }
}

fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || email.len() > EMAIL_MAX_LEN || email.contains(char::is_whitespace) {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(email)
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    list_id: Uuid,
    email: String,
    role: ShareRole,
    expires_in_days: Option<u32>,
}

impl TryFrom<JsonRpcRequest> for Params {
    type Error = InvalidParams;

    fn try_from(request: JsonRpcRequest) -> Result<Self, Self::Error> {
        let builder: ParamsBuilder =
            serde_json::from_value(request.params).map_err(InvalidParams::InvalidFormat)?;
        builder.try_into()
    }
}

impl TryFrom<ParamsBuilder> for Params {
    type Error = InvalidParams;

    fn try_from(builder: ParamsBuilder) -> Result<Self, Self::Error> {
        Params::new(
            builder.list_id,
            &builder.email,
            builder.role,
            builder.expires_in_days,
        )
    }
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    InvalidEmail,
    InvalidExpiry,
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::InvalidEmail => crate::generic_invalid_value_message("email"),
            InvalidParams::InvalidExpiry => crate::invalid_value_because_message(
                "expires_in_days",
                "must be at least 1".to_owned(),
            ),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub share: Share,
}

impl MethodResult {
    pub fn new(share: Share) -> Self {
        Self { share }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_lowercased() {
        let params = Params::new(Uuid::new_v4(), " Chef@Example.COM ", ShareRole::Edit, None).unwrap();
        assert_eq!(params.email, "chef@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in ["", "chef", "@example.com", "chef@", "a b@example.com", "a@b@c"] {
            assert!(
                matches!(
                    Params::new(Uuid::new_v4(), email, ShareRole::Read, None),
                    Err(InvalidParams::InvalidEmail)
                ),
                "{}",
                email
            );
        }
    }

    #[test]
    fn zero_day_expiry_is_rejected() {
        assert!(matches!(
            Params::new(Uuid::new_v4(), "chef@example.com", ShareRole::Read, Some(0)),
            Err(InvalidParams::InvalidExpiry)
        ));
    }
}
