//! Quill syntax tree.
//!
//! The interface contract between the external parser and the semantic
//! compiler: owned syntax nodes with source positions. Tokenizing and
//! grammar-driven parsing live outside this workspace; everything that
//! produces these nodes is an external collaborator.

pub mod ast;
