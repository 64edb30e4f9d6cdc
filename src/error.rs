use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridMapError {
    #[error("layer contains no features with a geometry")]
    EmptyLayer,
    #[error("feature {feature} has no numeric `{property}` property")]
    MissingWeight { feature: usize, property: String },
    #[error("feature {feature} has invalid weight {value}")]
    InvalidWeight { feature: usize, value: f64 },
    #[error("total region area is zero, grid cells cannot be sized")]
    ZeroArea,
    #[error("total weight is zero, grid cells cannot be sized")]
    ZeroWeight,
    #[error("cell size is not finite (total area {area}, total weight {weight})")]
    NonFiniteCellSize { area: f64, weight: f64 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("snap requested before the simulation converged")]
    NotConverged,
    #[error("tiles have already been snapped to their grid cells")]
    AlreadySnapped,
}

pub type Result<T> = std::result::Result<T, GridMapError>;
