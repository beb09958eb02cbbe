pub mod chronicle;
pub mod corpus;
pub mod culture;
pub mod entity;
pub mod event;
pub mod relationship;
pub mod source;
