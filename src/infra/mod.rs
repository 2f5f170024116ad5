pub mod accumulators;
pub mod api;
pub mod benefits;
pub mod circuit_breaker;
pub mod http;
pub mod metrics;
pub mod pcp;
pub mod rates;
pub mod token;
pub mod token_issuer;
