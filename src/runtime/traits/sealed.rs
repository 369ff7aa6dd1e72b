// ABOUTME: Sealed supertrait for the engine capability traits.
// ABOUTME: Only runtimes defined inside this crate can implement them.

/// Private supertrait; the module path is not exported, so downstream crates
/// cannot name it and therefore cannot implement the capability traits.
pub trait Sealed {}
