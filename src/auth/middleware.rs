use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::{errors::AppError, models::domain::UserRole};

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Caller identity forwarded by the session layer in front of this service.
///
/// A missing role header means `STUDENT`; a missing or blank user id is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub role: UserRole,
}

impl Viewer {
    fn from_headers(req: &HttpRequest) -> Result<Self, AppError> {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))?;

        let role = match req.headers().get(USER_ROLE_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| AppError::Unauthorized("Malformed role header".to_string()))?
                .parse()?,
            None => UserRole::Student,
        };

        Ok(Viewer {
            user_id: user_id.to_string(),
            role,
        })
    }
}

impl FromRequest for Viewer {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Viewer::from_headers(req))
    }
}
