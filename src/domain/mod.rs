//! Business rules with no I/O: roles, the order lifecycle, garment validation,
//! return eligibility, feedback validation and order statistics.

pub mod feedback;
pub mod garment;
pub mod lifecycle;
pub mod returns;
pub mod roles;
pub mod stats;
