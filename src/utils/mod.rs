use actix_web::{FromRequest, web};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TypeClaims {
    RefreshToken,
    AccessToken,
}

/// Claims carried by tokens minted by the platform identity service.
/// This service only verifies; it never issues tokens outside of tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: uuid::Uuid,
    pub iat: u64,
    pub exp: u64,
    pub _type: Option<TypeClaims>,
}

impl Claims {
    pub fn new(sub: &uuid::Uuid, exp: u64) -> Self {
        let now = chrono::Utc::now().timestamp() as u64;
        Claims { sub: *sub, iat: now, exp: now + exp, _type: None }
    }

    pub fn with_type(mut self, _type: TypeClaims) -> Self {
        self._type = Some(_type);
        self
    }

    #[allow(unused)]
    pub fn encode(&self, secret: &[u8]) -> Result<String, error::SystemError> {
        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, self, &EncodingKey::from_secret(secret))?;
        Ok(token)
    }

    pub fn decode(token: &str, secret: &[u8]) -> Result<Self, error::SystemError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        let token_data = decode::<Self>(token, &DecodingKey::from_secret(secret), &validation)?;
        Ok(token_data.claims)
    }
}

pub struct ValidatedJson<T>(pub T);

impl<T> FromRequest for ValidatedJson<T>
where
    T: Validate + serde::de::DeserializeOwned + 'static,
{
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let fut = web::Json::<T>::from_request(req, payload);

        Box::pin(async move {
            let json = fut.await.map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            let model = json.into_inner();
            model.validate().map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            Ok(ValidatedJson(model))
        })
    }
}

pub struct ValidatedQuery<T>(pub T);

impl<T> FromRequest for ValidatedQuery<T>
where
    T: Validate + serde::de::DeserializeOwned + 'static,
{
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let fut = web::Query::<T>::from_request(req, payload);

        Box::pin(async move {
            let query = fut.await.map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            query.validate().map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            Ok(ValidatedQuery(query.into_inner()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_roundtrips_through_hs256() {
        let uid = uuid::Uuid::now_v7();
        let claims = Claims::new(&uid, 900).with_type(TypeClaims::AccessToken);

        let token = claims.encode(b"test-secret").unwrap();
        let decoded = Claims::decode(&token, b"test-secret").unwrap();

        assert_eq!(decoded.sub, uid);
        assert_eq!(decoded._type, Some(TypeClaims::AccessToken));
    }

    #[test]
    fn decode_rejects_wrong_secret() {
        let uid = uuid::Uuid::now_v7();
        let token = Claims::new(&uid, 900).encode(b"right-secret").unwrap();

        assert!(Claims::decode(&token, b"wrong-secret").is_err());
    }
}
