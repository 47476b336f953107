use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the config at a mock PostgREST server (e.g. `MockServer::uri()`).
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig::for_supabase(&self.supabase_url, &self.supabase_anon_key, &self.jwt_secret)
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "cliente".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn medico(email: &str) -> Self {
        Self::new(email, "medico")
    }

    pub fn cliente(email: &str) -> Self {
        Self::new(email, "cliente")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "rol": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// PostgREST row shapes for the consultorio schema.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn horario_row(id: i64, dia_semana: i64, hora_inicio: &str, hora_fin: &str) -> serde_json::Value {
        json!({
            "id": id,
            "dia_semana": dia_semana,
            "hora_inicio": hora_inicio,
            "hora_fin": hora_fin,
            "medicos_id": 1,
            "consultorios_id": 1
        })
    }

    /// Template row with the embedded `medicos` and `consultorios` resources.
    pub fn horario_enriquecido_row(id: i64, dia_semana: i64, hora_inicio: &str) -> serde_json::Value {
        json!({
            "id": id,
            "dia_semana": dia_semana,
            "hora_inicio": hora_inicio,
            "medicos": {
                "nombre": "Ana",
                "apellido": "Pérez",
                "especialidad": "Cardiología"
            },
            "consultorios": {
                "numero": "101"
            }
        })
    }

    pub fn turno_reservado_row(horarios_medicos_id: i64, fecha_hora: &str) -> serde_json::Value {
        json!({
            "horarios_medicos_id": horarios_medicos_id,
            "fecha_hora": fecha_hora
        })
    }

    pub fn turno_completo_row(id: i64, estado: &str, fecha_hora: &str) -> serde_json::Value {
        json!({
            "id": id,
            "fecha_hora": fecha_hora,
            "estado": estado,
            "motivo": "Control anual",
            "fecha_creacion": "2024-01-01T10:00:00",
            "clientes_id": 7,
            "horarios_medicos_id": 3,
            "clientes": { "nombre": "Juan", "apellido": "Gómez" },
            "horarios_medicos": {
                "medicos": {
                    "id": 1,
                    "nombre": "Ana",
                    "apellido": "Pérez",
                    "especialidad": "Cardiología",
                    "matricula": "MP-1234"
                },
                "consultorios": {
                    "id": 1,
                    "numero": "101",
                    "ubicacion": "Planta baja",
                    "tipo": "general"
                }
            }
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
