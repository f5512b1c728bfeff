use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub payment_gateway_url: String,
    pub qr_service_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "courtbook.db".to_string()),
            payment_gateway_url: env::var("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:4100".to_string()),
            qr_service_url: env::var("QR_SERVICE_URL")
                .unwrap_or_else(|_| "https://api.qrserver.com/v1/create-qr-code".to_string()),
        }
    }
}
