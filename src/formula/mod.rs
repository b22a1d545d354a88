pub mod evaluator;
pub mod formula_model;
pub mod lexer;
pub mod parser;
