use thiserror::Error;

/// Everything that can go wrong in the FSS core, from key generation down to
/// the demonstration transport. Corrupted-but-well-formed keys are *not* an
/// error here: they silently produce wrong shares, as the cryptography
/// permits in the semi-honest model (see SPEC_FULL.md §7).
#[derive(Error, Debug)]
pub enum FssError {
    #[error("primitive store queue '{queue}' is empty")]
    EmptyPrimitiveStore { queue: &'static str },

    #[error("shape mismatch between operands: left has {left} elements, right has {right}")]
    ShapeMismatch { left: usize, right: usize },

    #[error("key generated for (lambda={expected_lambda}, n={expected_n}) used under (lambda={found_lambda}, n={found_n})")]
    ParameterMismatch {
        expected_lambda: usize,
        expected_n: usize,
        found_lambda: usize,
        found_n: usize,
    },

    #[error("PRG output width {requested} exceeds the underlying hash output of {max} bits")]
    PrgWidthExceeded { requested: usize, max: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type FssResult<T> = Result<T, FssError>;
