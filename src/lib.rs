pub mod config;
pub mod encoding;
pub mod errors;
pub mod field;
pub mod fixed;
pub mod natural;
pub mod repository;
pub mod truncation;

pub use config::{ConfigError, FieldConfig, FieldConfigBuilder};
pub use encoding::{EncodingError, decode, encode};
pub use errors::{MpcError, MpcResult};
pub use field::PrimeField;
pub use fixed::{Operand, SharedFixedPoint};
pub use natural::SharedNatural;
pub use repository::{
    LocalRepository, RepositoryError, ShareId, ShareRepository, ShareSource,
};
pub use truncation::sample_mask;
