//! Domain model module declarations.

pub mod approval;
pub mod owner;
pub mod transfer;
