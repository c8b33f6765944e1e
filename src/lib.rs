// onigvm - a pure-Rust regular-expression engine with Oniguruma-compatible semantics
//
// Module layout:
//   oniguruma     public types and constants shared across the crate
//   regint        bytecode instruction set and the compiled program layout
//   regenc        the Encoding trait and shared encoding utilities
//   encodings/*   one module per supported character set
//   regparse*     tokenizer, recursive-descent parser, and parse-tree types
//   regcomp       parse tree -> bytecode compiler, plus search optimization
//   regexec       the backtracking VM and its search driver
//   regset        searching several compiled patterns in one pass
//   scanner       the multi-pattern, cursor-driven high-level API

pub mod oniguruma;
pub mod regint;
pub mod regenc;
pub mod regsyntax;
pub mod regparse_types;
pub mod unicode;
pub mod encodings;
pub mod regparse;
pub mod regcomp;
pub mod regexec;
pub mod regset;
pub mod regtrav;
pub mod error;
pub mod api;
pub mod scanner;
pub mod prelude;
