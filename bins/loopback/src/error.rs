#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Unset(&'static str),

    #[error("{0} contains no broker addresses")]
    Empty(&'static str),
}
