//! A host program embedding CPython: the `api` module it exposes to Python and
//! the hello-world walkthrough that exercises both directions of calls.

pub mod api;
pub mod demo;
