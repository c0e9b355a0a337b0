use framediff_common::frame::Dimensions;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    #[error("blur size {value} outside supported range {min}..={max}")]
    InvalidBlurSize { value: u32, min: u32, max: u32 },
    #[error("frame is {got} but the session was established at {expected}")]
    DimensionMismatch { expected: Dimensions, got: Dimensions },
    #[error("frame has no pixels ({0})")]
    EmptyFrame(Dimensions),
}
