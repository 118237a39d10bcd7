//! Document parsing utilities
//!
//! This module contains specialized parsing functions for the XML parts of a
//! WordprocessingML package.

pub(crate) mod equation;
pub(crate) mod formatting;
pub(crate) mod numbering;
pub(crate) mod styles;
pub(crate) mod toc;
pub(crate) mod xml;
