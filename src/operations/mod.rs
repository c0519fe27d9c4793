//! Operations module provides the commands built on top of the client and comment tree

pub mod comments;
pub mod find;
