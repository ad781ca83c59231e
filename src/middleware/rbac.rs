// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::Session,
};

/// O que é uma permissão: um slug estático ("recurso:ação").
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// Extractor guardião: só deixa passar se o papel da sessão tem a permissão `T`.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_request_parts(parts, state).await.unwrap_or_default();

        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

        check_permission::<T>(session).map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        Ok(RequirePermission(PhantomData))
    }
}

fn check_permission<T: PermissionDef>(session: &Session) -> Result<(), AppError> {
    let required = T::slug();
    if session.role.has_permission(required) {
        return Ok(());
    }

    tracing::warn!(
        user_id = %session.user_id,
        role = ?session.role,
        permission = required,
        "Permissão negada"
    );
    Err(AppError::PermissionDenied(required))
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermWarehouseRead;
impl PermissionDef for PermWarehouseRead {
    fn slug() -> &'static str { "warehouse:read" }
}

pub struct PermWarehouseWrite;
impl PermissionDef for PermWarehouseWrite {
    fn slug() -> &'static str { "warehouse:write" }
}
