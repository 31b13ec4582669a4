pub mod convert;
pub mod expand;
pub mod normalize;
pub mod zone;
