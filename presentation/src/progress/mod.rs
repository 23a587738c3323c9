//! Progress reporting on stderr

pub mod reporter;
