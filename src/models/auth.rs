// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Papel do usuário dentro da organização (vem no token)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organization,
    Customer,
    Courier,
}

impl Role {
    /// Permissões concedidas a cada papel.
    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            Role::Organization => &["warehouse:read", "warehouse:write"],
            Role::Customer => &["warehouse:read"],
            Role::Courier => &[],
        }
    }

    pub fn has_permission(self, slug: &str) -> bool {
        self.permissions().contains(&slug)
    }
}

// Estrutura de dados ("claims") dentro do JWT.
// O token é emitido pelo serviço de identidade; aqui só validamos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // Subject (ID do usuário)
    pub tenant_id: Uuid, // Organização à qual o usuário pertence
    pub role: Role,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

// A sessão autenticada que acompanha cada operação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            role: claims.role,
        }
    }
}
