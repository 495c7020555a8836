pub mod color;
pub mod constants;
pub mod coordinates;
pub mod elements;

#[cfg(test)]
mod tests;

pub use color::{color_index_to_argb, pack_argb, unpack_argb};
pub use coordinates::{EngineDirection, EquatorialPosition};
pub use elements::{au_to_units, km_to_units, OrbitalElements};
