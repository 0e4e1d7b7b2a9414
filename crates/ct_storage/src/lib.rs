pub mod backends;

pub use backends::*;

pub mod prelude {
    pub use super::backends::*;
    pub use ct_core::StateStorage;
}
