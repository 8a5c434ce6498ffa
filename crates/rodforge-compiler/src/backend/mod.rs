//! Code generation back ends.
//!
//! A [`Backend`] renders a [`Program`] to text. The program is the only
//! input; back ends never look at the scene.
//!
//! Numbers are rendered with Rust's shortest round-trip float formatting
//! (`1.0`, `0.0002`, `1e-5`), which is both deterministic and valid Python.

mod listing;
mod python;

pub use listing::ListingBackend;
pub use python::PythonBackend;

use rodforge_scene::Vec3;

use crate::ir::Program;

/// Renders a compiled program.
pub trait Backend: Send + Sync {
    /// Short identifier (`python`, `listing`).
    fn name(&self) -> &'static str;

    /// Render the whole program.
    fn emit(&self, program: &Program) -> String;
}

/// Format a float as a literal.
pub(crate) fn float(value: f64) -> String {
    format!("{value:?}")
}

/// Format a vector as a list literal.
pub(crate) fn vector(value: &Vec3) -> String {
    format!("[{}, {}, {}]", float(value[0]), float(value[1]), float(value[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_a_decimal_point() {
        assert_eq!(float(10.0), "10.0");
        assert_eq!(float(0.025), "0.025");
        assert_eq!(float(1e-5), "1e-5");
    }

    #[test]
    fn vectors_render_as_lists() {
        assert_eq!(vector(&[0.0, -9.81, 1.0]), "[0.0, -9.81, 1.0]");
    }
}
