//! Tests for program evaluation
//!
//! Organized by feature area; trees are built with the helpers in `helpers`

mod helpers;

mod each_tests;
mod scope_tests;
