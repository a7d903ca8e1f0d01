pub mod commands;
pub mod loaders;
pub mod markup;
