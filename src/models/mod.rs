pub mod disk;
pub mod smart;
