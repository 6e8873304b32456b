use axum::{
    Json,
    extract::{FromRequest, OptionalFromRequest, Request},
};
use serde::de::DeserializeOwned;

use super::errors::AppError;

/// JSON body whose rejections render as the `AppError` envelope.
///
/// As `Option<ApiJson<T>>` a request without a `Content-Type` header yields
/// `None`, which lets routes with an all-optional body be called bare.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let body =
            <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
        Ok(body.map(|Json(value)| Self(value)))
    }
}
