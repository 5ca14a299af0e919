use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub mongodb_uri: String,
    pub database: String,
    pub collection: String,
    pub store_backend: String,
    pub output: String,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            environment: env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            mongodb_uri: env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: env::var("REPORT_DATABASE")
                .unwrap_or_else(|_| "facebookMetricsDB".to_string()),
            collection: env::var("REPORT_COLLECTION").unwrap_or_else(|_| "posts".to_string()),
            store_backend: env::var("STORE_BACKEND").unwrap_or_else(|_| "mongodb".to_string()),
            output: env::var("REPORT_OUTPUT").unwrap_or_else(|_| "text".to_string()),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "post-metrics-report".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
