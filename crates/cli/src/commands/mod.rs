pub mod eval;
pub mod keygen;
pub mod migrate;
pub mod validate;
