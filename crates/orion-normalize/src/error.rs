#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("node normalization service at {endpoint} returned status {status}")]
    NodeServiceStatus { endpoint: String, status: u16 },
    #[error("node normalization service at {endpoint} returned an empty body for {count} curies")]
    NodeServiceEmptyBody { endpoint: String, count: usize },
    #[error("edge normalization service at {endpoint} returned status {status}")]
    EdgeServiceStatus { endpoint: String, status: u16 },
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}
