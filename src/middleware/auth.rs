// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
    RequestExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::auth::{Claims, Session},
};

/// Valida o JWT (HS256) e devolve a sessão explícita.
pub fn decode_session(token: &str, jwt_secret: &str) -> Result<Session, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(token_data.claims.into())
}

async fn authenticate(app_state: &AppState, request: &mut Request) -> Result<Session, AppError> {
    let TypedHeader(Authorization(bearer)) = request
        .extract_parts::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AppError::InvalidToken)?;

    decode_session(bearer.token(), &app_state.jwt_secret)
}

// Middleware: exige um token válido e coloca a sessão nas "extensions"
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = request.extract_parts::<Locale>().await.unwrap_or_default();

    let session = authenticate(&app_state, &mut request)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

// Middleware: token válido + cabeçalho X-Tenant-ID igual à organização da sessão
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let locale = request.extract_parts::<Locale>().await.unwrap_or_default();
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let session = authenticate(&app_state, &mut request).await.map_err(to_api)?;
    let tenant = TenantContext::from_headers(request.headers()).map_err(to_api)?;

    if tenant.0 != session.tenant_id {
        tracing::warn!(
            user_id = %session.user_id,
            requested = %tenant.0,
            "Acesso negado: tenant diferente da sessão"
        );
        return Err(to_api(AppError::TenantMismatch));
    }

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

// Extrator para obter a sessão diretamente nos handlers
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }

        let app_state = AppState::from_ref(state);
        let locale = Locale::from_request_parts(parts, state).await.unwrap_or_default();
        Err(AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))
    }
}
