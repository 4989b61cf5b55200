//! CanvOS build configuration library
//!
//! Resolves catalog packs into build selections, writes the files the
//! image build consumes, pushes the built provider images and assembles
//! the Edge cluster profile that references them.

pub mod build_params;
pub mod catalog;
pub mod config;
pub mod error;
pub mod naming;
pub mod options;
pub mod profile;
pub mod push;
pub mod selection;

pub use error::{CanvosError, Result};
pub use options::OptionIndex;
pub use selection::SelectionSet;
