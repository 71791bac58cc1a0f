// Observability: metrics recorder and Pushgateway push

pub mod metrics;
