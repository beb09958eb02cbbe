pub mod apply;
pub mod classifier;
pub mod decision;
pub mod grammar;
pub mod names;
pub mod patch;
pub mod preview;
pub mod scanner;
pub mod session;
