pub mod run;
pub mod validate;
pub mod windows;
