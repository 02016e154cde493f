#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Generic {0}")]
    Generic(String),

    #[error("No input files found: {0}")]
    NoInputs(String),

    #[error("Network error: {0}")]
    Network(String),
}
